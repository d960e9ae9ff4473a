//! Custom order commands.

use std::path::{Path, PathBuf};

use julid_core::CustomOrderId;
use julid_storefront::error::StorefrontError;
use julid_storefront::models::ImageUpload;
use julid_storefront::services::CustomOrderForm;
use julid_storefront::state::AppState;

use crate::output;

pub async fn submit(
    state: &AppState,
    description: String,
    phone: String,
    name: Option<String>,
    email: Option<String>,
    image: Option<PathBuf>,
) -> Result<(), StorefrontError> {
    let image = match image {
        Some(path) => Some(read_image(&path).await?),
        None => None,
    };
    let form = CustomOrderForm {
        name,
        email,
        phone,
        description,
        image,
    };

    let created = state.custom_orders().submit(form).await?;
    state
        .notices()
        .success("✅ Your custom order request has been sent!");
    output::line(&format!("Custom order {} ({})", created.id, created.status));
    Ok(())
}

pub async fn list(state: &AppState) -> Result<(), StorefrontError> {
    let orders = state.custom_orders().list(None).await?;
    output::custom_orders(&orders);
    Ok(())
}

pub async fn cancel(state: &AppState, id: CustomOrderId, yes: bool) -> Result<(), StorefrontError> {
    if !yes {
        state
            .notices()
            .info(format!("Pass --yes to cancel custom order {id}"));
        return Ok(());
    }
    state.custom_orders().cancel(id).await?;
    state.notices().success("Order cancelled successfully");
    Ok(())
}

async fn read_image(path: &Path) -> Result<ImageUpload, StorefrontError> {
    let bytes = tokio::fs::read(path).await.map_err(|e| {
        StorefrontError::validation(format!("Cannot read image {}: {e}", path.display()))
    })?;
    let file_name = path
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("image")
        .to_string();
    Ok(ImageUpload {
        content_type: content_type(path).to_string(),
        file_name,
        bytes,
    })
}

fn content_type(path: &Path) -> &'static str {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase);
    match ext.as_deref() {
        Some("jpg" | "jpeg") => "image/jpeg",
        Some("png") => "image/png",
        Some("gif") => "image/gif",
        Some("webp") => "image/webp",
        _ => "application/octet-stream",
    }
}
