use crate::api_error::ApiError;
use diesel::pg::PgConnection;
use diesel::r2d2::ConnectionManager;

pub type Pool = r2d2::Pool<ConnectionManager<PgConnection>>;
pub type DbConnection = r2d2::PooledConnection<ConnectionManager<PgConnection>>;

embed_migrations!();

pub fn init_pool(database_url: &str) -> Pool {
    let manager = ConnectionManager::<PgConnection>::new(database_url);
    r2d2::Pool::builder()
        .build(manager)
        .expect("Failed to create db pool")
}

pub fn run_migrations(pool: &Pool) {
    let conn = pool.get().expect("Failed to get db connection");
    embedded_migrations::run(&conn).expect("Failed to run migrations");
    info!("Migrations up to date");
}

pub fn connection(pool: &Pool) -> Result<DbConnection, ApiError> {
    Ok(pool.get()?)
}
