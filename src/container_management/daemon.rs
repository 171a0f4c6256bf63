//! The narrow slice of the Docker Engine API the manager relies on.
//!
//! [`DockerDaemon`] is implemented for [`bollard::Docker`]; tests provide an
//! in-memory implementation that records every call it receives.

use async_trait::async_trait;
use bollard::auth::DockerCredentials;
use bollard::errors::Error as BollardError;
use bollard::models::{ContainerCreateBody, ContainerCreateResponse, CreateImageInfo, ImageSummary};
use bollard::query_parameters::{
    CreateContainerOptions, CreateImageOptionsBuilder, ListImagesOptionsBuilder,
};
use bollard::Docker;
use futures_util::stream::BoxStream;
use futures_util::StreamExt;

#[async_trait]
pub trait DockerDaemon: Send + Sync + 'static {
    /// Lists every local image, intermediate layers included.
    async fn list_images(&self) -> Result<Vec<ImageSummary>, BollardError>;

    /// Starts pulling `from_image:tag` and returns the daemon's progress
    /// messages. A request that cannot be initiated yields an error as its
    /// first item.
    fn pull_image<'a>(
        &'a self,
        from_image: &str,
        tag: &str,
        credentials: DockerCredentials,
    ) -> BoxStream<'a, Result<CreateImageInfo, BollardError>>;

    /// Creates a container with a daemon-generated name.
    async fn create_container(
        &self,
        config: ContainerCreateBody,
    ) -> Result<ContainerCreateResponse, BollardError>;
}

#[async_trait]
impl DockerDaemon for Docker {
    async fn list_images(&self) -> Result<Vec<ImageSummary>, BollardError> {
        Docker::list_images(self, Some(ListImagesOptionsBuilder::new().all(true).build())).await
    }

    fn pull_image<'a>(
        &'a self,
        from_image: &str,
        tag: &str,
        credentials: DockerCredentials,
    ) -> BoxStream<'a, Result<CreateImageInfo, BollardError>> {
        let options = CreateImageOptionsBuilder::new()
            .from_image(from_image)
            .tag(tag)
            .build();
        self.create_image(Some(options), None, Some(credentials))
            .boxed()
    }

    async fn create_container(
        &self,
        config: ContainerCreateBody,
    ) -> Result<ContainerCreateResponse, BollardError> {
        Docker::create_container(self, None::<CreateContainerOptions>, config).await
    }
}
