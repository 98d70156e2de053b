use std::sync::Arc;

use crate::config::Config;
use crate::database::Database;
use crate::entities::{artist, country, format, genre, label, packaging, store};
use crate::ports::discogs::DiscogsClient;
use crate::ports::google::GoogleTokenVerifier;
use crate::ports::query_translator::QueryTranslator;
use crate::services::auth::{AdminService, AuthService, TokenService};
use crate::services::discogs::DiscogsImportService;
use crate::services::images::ImageStore;
use crate::services::kollection::KollectionService;
use crate::services::list::ListService;
use crate::services::lookup::LookupService;
use crate::services::music_release::MusicReleaseService;
use crate::services::now_playing::NowPlayingService;
use crate::services::query::QueryService;
use crate::services::user_profile::UserProfileService;

/// Outbound adapters the services talk to.
pub struct Ports {
    pub google: Arc<dyn GoogleTokenVerifier>,
    pub discogs: Arc<dyn DiscogsClient>,
    pub query_translator: Arc<dyn QueryTranslator>,
}

pub struct AppState {
    pub db: Arc<Database>,
    pub config: Config,
    pub images: Arc<ImageStore>,
    pub auth: AuthService,
    pub admin: AdminService,
    pub artists: LookupService<artist::Entity>,
    pub countries: LookupService<country::Entity>,
    pub formats: LookupService<format::Entity>,
    pub genres: LookupService<genre::Entity>,
    pub labels: LookupService<label::Entity>,
    pub packagings: LookupService<packaging::Entity>,
    pub stores: LookupService<store::Entity>,
    pub releases: Arc<MusicReleaseService>,
    pub now_playing: NowPlayingService,
    pub kollections: KollectionService,
    pub lists: ListService,
    pub profiles: UserProfileService,
    pub discogs: DiscogsImportService,
    pub query: QueryService,
}

impl AppState {
    pub fn new(db: Arc<Database>, config: Config, tokens: TokenService, ports: Ports) -> Self {
        let images = Arc::new(ImageStore::new(config.images_path()));
        let releases = Arc::new(MusicReleaseService::new(db.clone(), images.clone()));
        Self {
            auth: AuthService::new(db.clone(), Arc::new(tokens), ports.google),
            admin: AdminService::new(db.clone(), images.clone()),
            artists: LookupService::new(db.clone()),
            countries: LookupService::new(db.clone()),
            formats: LookupService::new(db.clone()),
            genres: LookupService::new(db.clone()),
            labels: LookupService::new(db.clone()),
            packagings: LookupService::new(db.clone()),
            stores: LookupService::new(db.clone()),
            now_playing: NowPlayingService::new(db.clone()),
            kollections: KollectionService::new(db.clone()),
            lists: ListService::new(db.clone()),
            profiles: UserProfileService::new(db.clone(), images.clone()),
            discogs: DiscogsImportService::new(db.clone(), images.clone(), ports.discogs),
            query: QueryService::new(db.clone(), releases.clone(), ports.query_translator),
            releases,
            images,
            config,
            db,
        }
    }
}
