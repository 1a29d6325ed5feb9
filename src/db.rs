use crate::config::DatabaseConfig;
use crate::error::{ApiError, ApiResult};
use crate::models::user::User;
use crate::repository::UserRepository;
use async_trait::async_trait;
use deadpool_postgres::{Config, Object, Pool, PoolConfig, Runtime, Timeouts};
use native_tls::TlsConnector;
use postgres_native_tls::MakeTlsConnector;
use tokio_postgres::Row;
use tracing::{error, info, warn};

/// PostgreSQL への接続プールを握るリポジトリ層。
/// Deadpool の `Pool` を内部に保持し、`UserRepository` を実装する。
#[derive(Clone)]
pub struct Database {
    pool: Pool,
}

impl Database {
    /// 接続プールを構築し、起動時に疎通確認まで実施する。
    /// `async fn` なので `Database::new(config).await` のように `await` が必要。
    pub async fn new(config: DatabaseConfig) -> ApiResult<Self> {
        info!("Creating PostgreSQL connection pool for host: {}:{}", config.host, config.port);

        let pool = Self::create_pool(config)?;

        let db = Database { pool };
        db.health_check().await?;

        Ok(db)
    }

    /// Deadpool 用の `Config` を組み立ててプールを生成する内部関数。
    /// `match` で SSL モードを切り替え、`native_tls` で TLS コネクタを差し込んでいる。
    fn create_pool(config: DatabaseConfig) -> ApiResult<Pool> {
        let mut pg_config = Config::new();

        pg_config.host = Some(config.host);
        pg_config.port = Some(config.port);
        pg_config.dbname = Some(config.database);
        pg_config.user = Some(config.username);
        pg_config.password = Some(config.password);
        pg_config.connect_timeout = Some(config.connection_timeout);

        pg_config.ssl_mode = Some(match config.ssl_mode.as_str() {
            "disable" => deadpool_postgres::SslMode::Disable,
            "prefer" => deadpool_postgres::SslMode::Prefer,
            "require" => deadpool_postgres::SslMode::Require,
            other => {
                warn!("Unknown SSL mode '{}', defaulting to 'prefer'", other);
                deadpool_postgres::SslMode::Prefer
            }
        });

        pg_config.manager = Some(deadpool_postgres::ManagerConfig {
            recycling_method: deadpool_postgres::RecyclingMethod::Fast,
        });

        let mut pool_config = PoolConfig::new(config.max_connections as usize);
        pool_config.timeouts = Timeouts {
            wait: Some(config.connection_timeout),
            create: Some(config.connection_timeout),
            recycle: Some(config.connection_timeout),
        };
        pg_config.pool = Some(pool_config);

        let tls_connector = TlsConnector::builder()
            .build()
            .map_err(|e| {
                error!("Failed to create TLS connector: {}", e);
                ApiError::Database(format!("TLS connector creation failed: {}", e))
            })?;
        let tls = MakeTlsConnector::new(tls_connector);

        pg_config.create_pool(Some(Runtime::Tokio1), tls)
            .map_err(|e| {
                error!("Failed to create connection pool: {}", e);
                ApiError::Database(format!("Connection pool creation failed: {}", e))
            })
    }

    /// プールから接続を借りる小さなラッパー。
    /// `PoolError` は `From` 実装経由で `ApiError` に変換される。
    async fn get_connection(&self) -> ApiResult<Object> {
        self.pool.get().await.map_err(ApiError::from)
    }

    /// `SELECT 1` を投げて DB が生きているか確認する。
    pub async fn health_check(&self) -> ApiResult<()> {
        let client = self.get_connection().await?;

        client.execute("SELECT 1", &[])
            .await
            .map_err(|e| {
                error!("Database health check failed: {}", e);
                ApiError::Database(format!("Health check failed: {}", e))
            })?;

        info!("Database health check successful");
        Ok(())
    }

    /// 起動時に `users` テーブルを CREATE する簡易マイグレーター。
    /// `IF NOT EXISTS` なので何度実行しても安全。
    pub async fn migrate(&self) -> ApiResult<()> {
        info!("Running database migrations");

        let client = self.get_connection().await?;

        let users_table = r#"
            CREATE TABLE IF NOT EXISTS users (
                id BIGSERIAL PRIMARY KEY,
                name VARCHAR(255) NOT NULL
            )
        "#;

        client.execute(users_table, &[])
            .await
            .map_err(|e| {
                error!("Failed to create users table: {}", e);
                ApiError::Database(format!("Users table creation failed: {}", e))
            })?;

        info!("Database migrations completed successfully");
        Ok(())
    }

    /// 明示的な id で INSERT/UPDATE する。
    /// 直接 id を書き込むと BIGSERIAL のシーケンスは進まないので、同じトランザクション内で
    /// シーケンスを id の先まで進める。後退させることはない。
    async fn upsert_user(&self, id: i64, name: &str) -> ApiResult<User> {
        let mut client = self.get_connection().await?;
        let tx = client.transaction().await?;

        // Serializes explicit-id upserts against each other
        tx.execute("SELECT pg_advisory_xact_lock($1)", &[&USERS_ID_SEQUENCE_LOCK])
            .await?;

        let query = r#"
            INSERT INTO users (id, name)
            VALUES ($1, $2)
            ON CONFLICT (id) DO UPDATE SET name = EXCLUDED.name
            RETURNING id, name
        "#;

        let row = tx.query_one(query, &[&id, &name]).await?;

        let sequence = tx
            .query_one("SELECT last_value, is_called FROM users_id_seq", &[])
            .await?;

        if let Some(target) = sequence_advance(id, sequence.get(0), sequence.get(1)) {
            tx.execute("SELECT setval($1::TEXT::REGCLASS, $2, true)", &[&USERS_ID_SEQUENCE, &target])
                .await?;
            info!("Advanced {} to {}", USERS_ID_SEQUENCE, target);
        }

        tx.commit().await?;

        Ok(row_to_user(&row))
    }
}

/// `users.id` の BIGSERIAL が作るシーケンス名。
const USERS_ID_SEQUENCE: &str = "users_id_seq";

/// `pg_advisory_xact_lock` のキー。値自体に意味はない。
const USERS_ID_SEQUENCE_LOCK: i64 = 0x7573_6572_735f_6964;

/// 明示的な `id` を書き込んだ後、シーケンスをどこまで進めるべきかを返す。
/// 次に `nextval` が返す値が既に `id` より大きければ `None` (何もしない)。
fn sequence_advance(id: i64, last_value: i64, is_called: bool) -> Option<i64> {
    let next = if is_called {
        last_value.checked_add(1)?
    } else {
        last_value
    };

    (id >= next).then_some(id)
}

/// `tokio_postgres::Row` から `User` を取り出す。列順は `id, name` 固定。
fn row_to_user(row: &Row) -> User {
    User::with_id(row.get(0), row.get::<_, String>(1))
}

#[async_trait]
impl UserRepository for Database {
    /// `id` の有無で INSERT と UPSERT を切り替える。
    async fn save(&self, user: User) -> ApiResult<User> {
        if let Some(id) = user.id {
            let saved = self.upsert_user(id, &user.name).await?;
            info!("Upserted user with id: {}", id);
            return Ok(saved);
        }

        let client = self.get_connection().await?;

        let query = "INSERT INTO users (name) VALUES ($1) RETURNING id, name";
        let row = client.query_one(query, &[&user.name]).await?;

        let created_user = row_to_user(&row);
        info!("Created user with id: {:?}", created_user.id);
        Ok(created_user)
    }

    /// 全ユーザーを id 昇順で取得する。
    /// `rows.iter().map(...)` のクロージャ内で `Row` から型安全に取り出す。
    async fn find_all(&self) -> ApiResult<Vec<User>> {
        let client = self.get_connection().await?;

        let rows = client
            .query("SELECT id, name FROM users ORDER BY id", &[])
            .await?;

        Ok(rows.iter().map(row_to_user).collect())
    }

    /// 見つからない場合もエラーにはせず `None` を返す。
    async fn find_by_id(&self, id: i64) -> ApiResult<Option<User>> {
        let client = self.get_connection().await?;

        let row = client
            .query_opt("SELECT id, name FROM users WHERE id = $1", &[&id])
            .await?;

        Ok(row.as_ref().map(row_to_user))
    }
}
