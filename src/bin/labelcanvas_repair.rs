//! Remove corrupted annotation records from a JSON file store.
//!
//! Usage: `labelcanvas-repair [--config <file>] [<store.json>]`
//!
//! Without a store argument the `store_path` from the configuration is used.

#[cfg(not(target_arch = "wasm32"))]
fn main() {
    use std::path::PathBuf;

    use labelcanvas::AnnotatorConfig;

    let mut args = std::env::args().skip(1);
    let mut config_path: Option<PathBuf> = None;
    let mut store_path: Option<PathBuf> = None;
    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--config" => config_path = args.next().map(PathBuf::from),
            "-h" | "--help" => {
                println!("usage: labelcanvas-repair [--config <file>] [<store.json>]");
                return;
            }
            _ => store_path = Some(PathBuf::from(arg)),
        }
    }

    let config = match &config_path {
        Some(path) => match AnnotatorConfig::load(path) {
            Ok(config) => config,
            Err(e) => {
                eprintln!("Failed to load config {:?}: {}", path, e);
                std::process::exit(2);
            }
        },
        None => AnnotatorConfig::load_or_default(),
    };

    env_logger::Builder::new()
        .filter_level(config.log_level.to_level_filter())
        .parse_default_env()
        .init();

    let Some(store_path) = store_path.or_else(|| config.store_path.clone()) else {
        log::error!("No store given and no store_path configured");
        std::process::exit(2);
    };

    match pollster::block_on(repair::run(&store_path, config.pretty_store)) {
        Ok(removed) => println!("Removed {} corrupted annotations from {:?}", removed, store_path),
        Err(e) => {
            log::error!("Repair of {:?} failed: {}", store_path, e);
            eprintln!("{}", e.user_message());
            std::process::exit(1);
        }
    }
}

#[cfg(not(target_arch = "wasm32"))]
mod repair {
    use std::path::Path;

    use labelcanvas::registry::{
        ImageDimensions, ImageRegistry, Label, LabelRegistry, ProjectRegistry,
    };
    use labelcanvas::store::JsonFileStore;
    use labelcanvas::{AnnotationService, ServiceError};

    /// Stand-in collaborators: repair never creates annotations, it only
    /// reports the recomputed image status.
    struct StatusReporter;

    impl LabelRegistry for StatusReporter {
        fn current_label(&self) -> Option<Label> {
            None
        }

        fn label_exists(&self, _label_id: &str) -> bool {
            true
        }
    }

    impl ImageRegistry for StatusReporter {
        fn image_dimensions(&self, _image_id: &str) -> Option<ImageDimensions> {
            None
        }

        fn set_annotation_status(&self, image_id: &str, is_annotated: bool, count: usize) {
            log::info!(
                "Image {}: annotated={} count={}",
                image_id,
                is_annotated,
                count
            );
        }
    }

    impl ProjectRegistry for StatusReporter {
        fn project_exists(&self, _project_id: &str) -> bool {
            true
        }
    }

    pub async fn run(path: &Path, pretty: bool) -> Result<usize, ServiceError> {
        let store = JsonFileStore::open(path).await?.with_pretty(pretty);
        let mut service = AnnotationService::new(store, StatusReporter);
        let removed = service.repair_corrupted().await?;
        service.close().await?;
        Ok(removed)
    }

}

// The file store needs a filesystem
#[cfg(target_arch = "wasm32")]
fn main() {}
