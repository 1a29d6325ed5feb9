use serde::{Deserialize, Serialize};

/// `users` テーブルの 1 行を表すエンティティ。
/// `id` はストアが採番するため、保存前は `None` のまま扱う。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: Option<i64>,
    pub name: String,
}

impl User {
    /// まだ永続化されていない `User` を作る。
    /// 採番は `UserRepository::save` の責務なので、ここでは `id` を埋めない。
    pub fn new(name: impl Into<String>) -> Self {
        User {
            id: None,
            name: name.into(),
        }
    }

    /// 採番済みの `id` を持つ `User` を返す。
    /// リポジトリ実装が INSERT の結果から値を組み立てるときに使う。
    pub fn with_id(id: i64, name: impl Into<String>) -> Self {
        User {
            id: Some(id),
            name: name.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_user_has_no_id() {
        let user = User::new("test");

        assert_eq!(user.id, None);
        assert_eq!(user.name, "test");
    }

    #[test]
    fn test_name_is_not_validated() {
        let empty = User::new("");
        assert_eq!(empty.name, "");

        let long = User::new("x".repeat(1000));
        assert_eq!(long.name.len(), 1000);
    }

    #[test]
    fn test_user_serialization() {
        let user = User::with_id(1, "test");

        let json = serde_json::to_string(&user).expect("Failed to serialize user");
        assert_eq!(json, r#"{"id":1,"name":"test"}"#);
    }

    #[test]
    fn test_unsaved_user_serializes_null_id() {
        let json = serde_json::to_string(&User::new("test")).expect("Failed to serialize user");
        assert_eq!(json, r#"{"id":null,"name":"test"}"#);
    }

    #[test]
    fn test_user_deserialization() {
        let json = r#"{"id":42,"name":"Jane Doe"}"#;

        let user: User = serde_json::from_str(json).expect("Failed to deserialize user");

        assert_eq!(user.id, Some(42));
        assert_eq!(user.name, "Jane Doe");
    }
}
