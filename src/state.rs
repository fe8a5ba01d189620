use std::sync::Arc;

use crate::{
    config::AppConfig,
    db::{DbPool, OrmConn, create_orm_conn},
    mailer::{LogMailer, Mailer},
};

#[derive(Clone)]
pub struct AppState {
    pub pool: DbPool,
    pub orm: OrmConn,
    pub config: Arc<AppConfig>,
    pub mailer: Arc<dyn Mailer>,
}

impl AppState {
    pub fn new(pool: DbPool, config: AppConfig) -> Self {
        Self::with_mailer(pool, config, Arc::new(LogMailer))
    }

    pub fn with_mailer(pool: DbPool, config: AppConfig, mailer: Arc<dyn Mailer>) -> Self {
        let orm = create_orm_conn(&pool);
        Self {
            pool,
            orm,
            config: Arc::new(config),
            mailer,
        }
    }
}
