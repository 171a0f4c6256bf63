#[cfg(test)]
mod integration_tests {
    use crate::configuration::types::{ContainerConfig, Mount};
    use crate::container_management::ContainerManager;
    use crate::error_handling::types::ContainerError;
    use std::collections::HashMap;
    use std::time::Duration;
    use tokio::time::timeout;

    const TEST_IMAGE: &str = "alpine:3.19";

    fn is_docker_available() -> bool {
        std::process::Command::new("docker")
            .arg("info")
            .output()
            .map(|output| output.status.success())
            .unwrap_or(false)
    }

    #[tokio::test]
    #[ignore = "requires a running Docker daemon"]
    async fn test_pull_then_has_image() {
        if !is_docker_available() {
            return;
        }

        let manager = ContainerManager::new()
            .await
            .expect("Failed to connect to the daemon");

        let mut progress = Vec::new();
        timeout(
            Duration::from_secs(120),
            manager.pull_image_to(TEST_IMAGE, &mut progress),
        )
        .await
        .expect("Pull timed out")
        .expect("Pull failed");

        assert!(!progress.is_empty());
        assert!(manager.has_image(TEST_IMAGE).await);

        println!("Pulled {} ({} bytes of progress)", TEST_IMAGE, progress.len());
    }

    #[tokio::test]
    #[ignore = "requires a running Docker daemon"]
    async fn test_create_container_end_to_end() {
        if !is_docker_available() {
            return;
        }

        let manager = ContainerManager::new()
            .await
            .expect("Failed to connect to the daemon");
        manager
            .ensure_image(TEST_IMAGE)
            .await
            .expect("Failed to make the test image available");

        let config = ContainerConfig {
            image: TEST_IMAGE.to_string(),
            cmd: "echo hi | tr a-z A-Z".to_string(),
            env: HashMap::from([("X".to_string(), "1".to_string())]),
            mounts: vec![Mount::new("/tmp", "/host-tmp", true)],
        };

        let handle = manager
            .container_create(config)
            .await
            .expect("Failed to create container");
        assert!(!handle.id().is_empty());
        assert!(manager.owns(&handle));

        println!("Created container {}", handle.id());

        // Lifecycle is out of the manager's hands; clean up through the CLI.
        let _ = std::process::Command::new("docker")
            .args(["rm", "-f", handle.id()])
            .output();
    }

    #[tokio::test]
    #[ignore = "requires a running Docker daemon"]
    async fn test_unknown_image_pull_fails() {
        if !is_docker_available() {
            return;
        }

        let manager = ContainerManager::new()
            .await
            .expect("Failed to connect to the daemon");

        match manager
            .pull_image_to("localhost:1/definitely/not-here:never", &mut Vec::new())
            .await
        {
            Err(ContainerError::PullFailed(e)) => println!("Correctly failed: {}", e),
            other => panic!("Unexpected pull result: {:?}", other),
        }
    }
}
