//! Image ingestion: decode the three embedded payloads and publish them concurrently.

use crate::{
    clients::ImageHost,
    error::Result,
    models::{ImageRole, ReferenceImages, ReferenceUrls, UploadedReference},
};
use futures::future::try_join3;

/// Decodes every payload before the first upload is issued, then uploads all
/// three at once. The first rejection fails the whole step.
pub async fn ingest(host: &dyn ImageHost, references: &ReferenceImages) -> Result<ReferenceUrls> {
    let background = references.background.decode(ImageRole::Background)?;
    let product = references.product.decode(ImageRole::Product)?;
    let composition = references.composition.decode(ImageRole::Composition)?;

    let (background, product, composition) = try_join3(
        upload_one(host, ImageRole::Background, &background),
        upload_one(host, ImageRole::Product, &product),
        upload_one(host, ImageRole::Composition, &composition),
    )
    .await?;

    Ok(ReferenceUrls::from_uploads([background, product, composition]))
}

async fn upload_one(host: &dyn ImageHost, role: ImageRole, bytes: &[u8]) -> Result<UploadedReference> {
    let url = host.upload(role, bytes).await?;
    Ok(UploadedReference { role, url })
}
