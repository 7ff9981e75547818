use cinema_booking_api::{
    config::AppConfig,
    db::{create_orm_conn, create_pool, run_migrations},
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let config = AppConfig::from_env()?;
    let pool = create_pool(&config).await?;
    let orm = create_orm_conn(pool);
    run_migrations(&orm).await?;
    println!("Migrations applied");
    Ok(())
}
