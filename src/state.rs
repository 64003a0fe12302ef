use std::sync::Arc;

use axum::extract::FromRef;

use crate::auth::{SocialIdentityProvider, TokenError, TokenService};
use crate::config::AppConfig;
use crate::database::repository::{
    CompostRepository, IrrigationRepository, MachineCodeRepository, SoilRepository, UserRepository,
};
use crate::database::Database;
use crate::services::AuthService;

/// Everything a handler may need, built once at startup.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub db: Database,
    pub tokens: Arc<TokenService>,
    pub auth: AuthService,
    pub users: UserRepository,
    pub compost: CompostRepository,
    pub irrigation: IrrigationRepository,
    pub soil: SoilRepository,
    pub machine_codes: MachineCodeRepository,
}

impl AppState {
    pub fn new(
        config: AppConfig,
        db: Database,
        social: Arc<dyn SocialIdentityProvider>,
    ) -> Result<Self, TokenError> {
        let tokens = Arc::new(TokenService::from_config(&config.security)?);
        let users = UserRepository::new(&db);
        let auth = AuthService::new(users.clone(), tokens.clone(), social);

        Ok(Self {
            compost: CompostRepository::new(&db),
            irrigation: IrrigationRepository::new(&db),
            soil: SoilRepository::new(&db),
            machine_codes: MachineCodeRepository::new(&db),
            config: Arc::new(config),
            db,
            tokens,
            auth,
            users,
        })
    }
}

impl FromRef<AppState> for Arc<AppConfig> {
    fn from_ref(state: &AppState) -> Self {
        state.config.clone()
    }
}

impl FromRef<AppState> for Database {
    fn from_ref(state: &AppState) -> Self {
        state.db.clone()
    }
}

impl FromRef<AppState> for Arc<TokenService> {
    fn from_ref(state: &AppState) -> Self {
        state.tokens.clone()
    }
}

impl FromRef<AppState> for AuthService {
    fn from_ref(state: &AppState) -> Self {
        state.auth.clone()
    }
}

impl FromRef<AppState> for UserRepository {
    fn from_ref(state: &AppState) -> Self {
        state.users.clone()
    }
}

impl FromRef<AppState> for CompostRepository {
    fn from_ref(state: &AppState) -> Self {
        state.compost.clone()
    }
}

impl FromRef<AppState> for IrrigationRepository {
    fn from_ref(state: &AppState) -> Self {
        state.irrigation.clone()
    }
}

impl FromRef<AppState> for SoilRepository {
    fn from_ref(state: &AppState) -> Self {
        state.soil.clone()
    }
}

impl FromRef<AppState> for MachineCodeRepository {
    fn from_ref(state: &AppState) -> Self {
        state.machine_codes.clone()
    }
}
