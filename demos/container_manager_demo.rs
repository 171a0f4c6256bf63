use std::collections::HashMap;

use contman::configuration::{ContainerConfig, Mount};
use contman::container_management::ContainerManager;
use log::{error, info};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::Builder::from_default_env()
        .filter_level(log::LevelFilter::Info)
        .init();

    info!("Starting container manager demo");

    let manager = match ContainerManager::new().await {
        Ok(mgr) => {
            info!("Container manager initialized successfully");
            mgr
        }
        Err(e) => {
            error!("Failed to initialize ContainerManager (is a Docker daemon running?): {}", e);
            return Err(e.into());
        }
    };

    let image = "alpine:3.19";
    if manager.ensure_image(image).await? {
        info!("Pulled {}", image);
    } else {
        info!("{} already present", image);
    }

    let scratch = std::env::temp_dir().join("contman-demo");
    std::fs::create_dir_all(&scratch)?;

    let config = ContainerConfig {
        image: image.to_string(),
        cmd: "echo \"hello from $GREETER\" | tee /scratch/hello.txt".to_string(),
        env: HashMap::from([("GREETER".to_string(), "contman".to_string())]),
        mounts: vec![Mount::new(scratch.to_string_lossy(), "/scratch", false)],
    };

    let handle = manager.container_create(config).await?;
    info!(
        "Created container {} at {}; start it with `docker start -a {}`",
        handle.id(),
        handle.created_at(),
        handle.id()
    );

    manager.shutdown();
    info!("Demo ended");
    Ok(())
}
