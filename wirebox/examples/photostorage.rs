//! Photo storage application wired with wirebox.
//!
//! Run with `RUST_LOG=wirebox_container=debug PHOTOS__PGSQL__HOST=db cargo run --example photostorage`.

use std::sync::Arc;

use serde::Deserialize;
use tracing::info;
use tracing_subscriber::EnvFilter;
use wirebox::prelude::*;

// === Gateways ===

#[derive(Debug, Deserialize)]
struct PgSettings {
    host: String,
    port: u16,
    database: String,
}

struct PostgreSQL {
    dsn: String,
}

impl PostgreSQL {
    fn connect(settings: PgSettings) -> Self {
        info!(host = %settings.host, "Connecting to PostgreSQL");
        Self {
            dsn: format!("postgres://{}:{}/{}", settings.host, settings.port, settings.database),
        }
    }
}

struct Redis {
    url: String,
}

struct S3 {
    bucket: String,
}

// === Models ===

struct User {
    id: u64,
    login: String,
}

struct Photo {
    id: u64,
    owner_id: u64,
    location: String,
}

// === Mappers ===

struct UsersMapper {
    database: Arc<PostgreSQL>,
    user_factory: Arc<Delegate>,
}

impl UsersMapper {
    fn find(&self, id: u64) -> wirebox::Result<Arc<User>> {
        info!(dsn = %self.database.dsn, id, "Loading user");
        self.user_factory.create_with([
            ("id", Argument::value(id)),
            ("login", Argument::value(format!("user{id}"))),
        ])
    }
}

struct PhotosMapper {
    database: Arc<PostgreSQL>,
    file_storage: Arc<S3>,
    photo_factory: Arc<Delegate>,
}

impl PhotosMapper {
    fn for_owner(&self, owner_id: u64) -> wirebox::Result<Vec<Arc<Photo>>> {
        info!(dsn = %self.database.dsn, owner_id, "Loading photos");
        (1..=2u64)
            .map(|id| {
                self.photo_factory.create_with([
                    ("id", Argument::value(id)),
                    ("owner_id", Argument::value(owner_id)),
                    ("location", Argument::value(format!("s3://{}/{owner_id}/{id}.jpg", self.file_storage.bucket))),
                ])
            })
            .collect()
    }
}

// === Services ===

struct PasswordHasher {
    salt_size: u32,
    rounds: u32,
}

struct AuthService {
    users: Arc<UsersMapper>,
    hasher: Arc<PasswordHasher>,
    sessions: Arc<Redis>,
}

impl AuthService {
    fn login(&self, user_id: u64) -> wirebox::Result<Arc<User>> {
        let user = self.users.find(user_id)?;
        info!(
            login = %user.login,
            salt_size = self.hasher.salt_size,
            rounds = self.hasher.rounds,
            sessions = %self.sessions.url,
            "User authenticated"
        );
        Ok(user)
    }
}

struct PhotosService {
    photos: Arc<PhotosMapper>,
}

// === Web ===

struct WebHandler {
    auth: Arc<AuthService>,
    photos: Arc<PhotosService>,
}

impl WebHandler {
    fn get_photos(&self, user_id: u64) -> wirebox::Result<Vec<String>> {
        let user = self.auth.login(user_id)?;
        let photos = self.photos.photos.for_owner(user.id)?;
        Ok(photos
            .iter()
            .map(|photo| format!("#{} of {}: {}", photo.id, photo.owner_id, photo.location))
            .collect())
    }
}

// === Wiring ===

struct Gateways;

impl Module for Gateways {
    fn register(&self, declarations: &mut dyn Declarations) {
        declarations.declare(
            "database".into(),
            Provider::singleton(|args: &Arguments| Ok(PostgreSQL::connect(args.config("settings")?)))
                .kwarg("settings", Argument::provider("config.pgsql"))
                .into(),
        );
        declarations.declare(
            "redis".into(),
            Provider::singleton(|args: &Arguments| {
                Ok(Redis {
                    url: format!("redis://{}:{}", args.config::<String>("host")?, args.config::<u16>("port")?),
                })
            })
            .kwarg("host", Argument::provider("config.redis.host"))
            .kwarg("port", Argument::provider("config.redis.port"))
            .into(),
        );
        declarations.declare(
            "s3".into(),
            Provider::singleton(|args: &Arguments| Ok(S3 { bucket: args.config("bucket")? }))
                .kwarg("bucket", Argument::provider("config.s3.bucket"))
                .into(),
        );
    }
}

struct Models;

impl Module for Models {
    fn register(&self, declarations: &mut dyn Declarations) {
        declarations.declare(
            "user".into(),
            Provider::factory(|args: &Arguments| {
                Ok(User {
                    id: args.cloned("id")?,
                    login: args.cloned("login")?,
                })
            })
            .into(),
        );
        declarations.declare(
            "photo".into(),
            Provider::factory(|args: &Arguments| {
                Ok(Photo {
                    id: args.cloned("id")?,
                    owner_id: args.cloned("owner_id")?,
                    location: args.cloned("location")?,
                })
            })
            .into(),
        );
        declarations.declare(
            "users_mapper".into(),
            Provider::singleton(|args: &Arguments| {
                Ok(UsersMapper {
                    database: args.get("database")?,
                    user_factory: args.delegate("user_factory")?,
                })
            })
            .kwarg("database", Argument::provider("database"))
            .kwarg("user_factory", Argument::delegate("user"))
            .into(),
        );
        declarations.declare(
            "photos_mapper".into(),
            Provider::singleton(|args: &Arguments| {
                Ok(PhotosMapper {
                    database: args.get("database")?,
                    file_storage: args.get("file_storage")?,
                    photo_factory: args.delegate("photo_factory")?,
                })
            })
            .kwarg("database", Argument::provider("database"))
            .kwarg("file_storage", Argument::provider("s3"))
            .kwarg("photo_factory", Argument::delegate("photo"))
            .into(),
        );
    }
}

struct Services;

impl Module for Services {
    fn register(&self, declarations: &mut dyn Declarations) {
        declarations.declare(
            "password_hasher".into(),
            Provider::factory(|args: &Arguments| {
                Ok(PasswordHasher {
                    salt_size: args.config("salt_size")?,
                    rounds: *args.get::<u32>("rounds")?,
                })
            })
            .kwarg("salt_size", Argument::provider("config.auth.salt_size"))
            .kwarg("rounds", Argument::value(10_000u32))
            .into(),
        );
        declarations.declare(
            "auth_service".into(),
            Provider::singleton(|args: &Arguments| {
                Ok(AuthService {
                    users: args.get("users")?,
                    hasher: args.get("hasher")?,
                    sessions: args.get("sessions")?,
                })
            })
            .kwarg("users", Argument::provider("users_mapper"))
            .kwarg("hasher", Argument::provider("password_hasher"))
            .kwarg("sessions", Argument::provider("redis"))
            .into(),
        );
        declarations.declare(
            "photos_service".into(),
            Provider::singleton(|args: &Arguments| Ok(PhotosService { photos: args.get("photos")? }))
                .kwarg("photos", Argument::provider("photos_mapper"))
                .into(),
        );
    }
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("wirebox=info,wirebox_container=info,photostorage=info")))
        .init();

    let config = Configuration::new();
    config.set_default("pgsql.port", serde_json::json!(5432));
    config.set_default("redis", serde_json::json!({ "host": "localhost", "port": 6379 }));
    config.set_default("auth.salt_size", serde_json::json!(16));

    let container = Container::builder()
        .configuration("config", config.clone())
        .module(&Gateways)
        .module(&Models)
        .module(&Services)
        .provide(
            "web_handler",
            Provider::factory(|args: &Arguments| {
                Ok(WebHandler {
                    auth: args.get("auth")?,
                    photos: args.get("photos")?,
                })
            })
            .kwarg("auth", Argument::provider("auth_service"))
            .kwarg("photos", Argument::provider("photos_service")),
        )
        .provide(
            "run_web_app",
            Provider::callable(|args: &Arguments| {
                let handler = args.at::<WebHandler>(0)?;
                let user_id = *args.get::<u64>("user_id")?;
                for line in handler.get_photos(user_id)? {
                    info!("{line}");
                }
                Ok(())
            })
            .arg(Argument::provider("web_handler"))
            .kwarg("user_id", Argument::value(7u64)),
        )
        .build()?;

    // Settings are loaded after wiring; nothing has been built yet.
    config.load_json_str(r#"{ "pgsql": { "host": "localhost", "database": "photos" }, "s3": { "bucket": "photos" } }"#)?;
    config.load_env("PHOTOS");

    info!(providers = container.len(), "Container ready");
    container.resolve::<()>("run_web_app")?;

    // Swap the session store for tests or local runs.
    container.declare("local_sessions", Provider::value(Redis { url: String::from("memory://") }))?;
    container.override_arguments("auth_service", [("sessions", Argument::provider("local_sessions"))])?;
    container.reset_singletons();
    container.resolve::<()>("run_web_app")?;

    Ok(())
}
