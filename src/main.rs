use clap::Parser;
use contman::configuration::{Cli, Command, CreateArgs};
use contman::container_management::ContainerManager;
use log::{error, info};

#[tokio::main]
async fn main() {
    // https://docs.rs/env_logger/latest/env_logger/
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_target(false)
        .init();

    let args = Cli::parse();

    if let Command::SystemMounts = args.command {
        for mount in contman::container_management::system_mounts() {
            println!(
                "{}:{}:{}",
                mount.source,
                mount.target,
                if mount.read_only { "ro" } else { "rw" }
            );
        }
        return;
    }

    let mut manager = ContainerManager::new().await.unwrap_or_else(|e| {
        error!("Unable to connect to the container daemon: {}, exiting...", e);
        std::process::exit(1);
    });
    if let Some(path) = &args.docker_config {
        manager = manager.with_docker_config(path);
    }

    let code = match args.command {
        Command::HasImage { image } => {
            println!("{}", manager.has_image(&image).await);
            0
        }
        Command::Pull { image } => match manager.pull_image(&image).await {
            Ok(()) => 0,
            Err(e) => {
                error!("Unable to pull {}: {}", image, e);
                1
            }
        },
        Command::Create(create) => run_create(&manager, create).await,
        Command::SystemMounts => 0,
    };

    manager.shutdown();
    std::process::exit(code);
}

async fn run_create(manager: &ContainerManager, args: CreateArgs) -> i32 {
    let config = match args.to_container_config() {
        Ok(config) => config,
        Err(e) => {
            error!("Invalid container configuration: {}", e);
            return 2;
        }
    };

    if args.pull {
        if let Err(e) = manager.ensure_image(&config.image).await {
            error!("Unable to make image {} available: {}", config.image, e);
            return 1;
        }
    }

    match manager.container_create(config).await {
        Ok(handle) => {
            info!("Container ready: {}", handle.id());
            println!("{}", handle.id());
            0
        }
        Err(e) => {
            error!("Unable to create container: {}", e);
            1
        }
    }
}
