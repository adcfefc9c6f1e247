//! Asset loading.
//!
//! Everything here runs off the render thread and produces plain CPU data:
//! [`scene::decode_gltf`] turns a `.glb` into a [`scene::DecodedScene`] and
//! [`environment::decode_hdr`] turns the sky panorama into float pixels. GPU
//! upload happens later on the event-loop thread.
//!
//! On native, assets are read from `./assets`, falling back to the crate's
//! own asset directory. On the web they are fetched relative to the page.

pub mod draco;
pub mod environment;
pub mod mesh;
pub mod scene;
pub mod texture;

#[cfg(not(target_arch = "wasm32"))]
use anyhow::Context as _;

#[cfg(target_arch = "wasm32")]
fn format_url(file_name: &str) -> anyhow::Result<reqwest::Url> {
    let window = web_sys::window().ok_or_else(|| anyhow::anyhow!("no window"))?;
    let href = window
        .location()
        .href()
        .map_err(|e| anyhow::anyhow!("cannot read page location: {e:?}"))?;
    let base = reqwest::Url::parse(&href)?;
    Ok(base.join(file_name)?)
}

/// Resolve an asset path on disk.
#[cfg(not(target_arch = "wasm32"))]
pub fn asset_path(file_name: &str) -> std::path::PathBuf {
    let local = std::path::Path::new("./").join("assets").join(file_name);
    if local.exists() {
        return local;
    }
    std::path::Path::new(env!("FLOOR_VIEWER_ASSET_DIR")).join(file_name)
}

pub async fn load_string(file_name: &str) -> anyhow::Result<String> {
    #[cfg(target_arch = "wasm32")]
    let txt = {
        let url = format_url(file_name)?;
        reqwest::get(url).await?.error_for_status()?.text().await?
    };
    #[cfg(not(target_arch = "wasm32"))]
    let txt = {
        let path = asset_path(file_name);
        tokio::fs::read_to_string(&path)
            .await
            .with_context(|| format!("reading {}", path.display()))?
    };

    Ok(txt)
}

pub async fn load_binary(file_name: &str) -> anyhow::Result<Vec<u8>> {
    #[cfg(target_arch = "wasm32")]
    let data = {
        let url = format_url(file_name)?;
        reqwest::get(url)
            .await?
            .error_for_status()?
            .bytes()
            .await?
            .to_vec()
    };
    #[cfg(not(target_arch = "wasm32"))]
    let data = {
        let path = asset_path(file_name);
        tokio::fs::read(&path)
            .await
            .with_context(|| format!("reading {}", path.display()))?
    };

    Ok(data)
}

/// Join `uri` onto the directory of `base`, e.g. `./model/a.glb` + `tex.png`.
pub fn relative_to(base: &str, uri: &str) -> String {
    match base.rfind('/') {
        Some(idx) => format!("{}/{}", &base[..idx], uri),
        None => uri.to_string(),
    }
}
