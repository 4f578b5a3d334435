use base64::Engine as _;

/// Whether `location` is a remote URL rather than a file below `assets/`.
pub fn is_remote(location: &str) -> bool {
    location.starts_with("http://") || location.starts_with("https://")
}

#[cfg(target_arch = "wasm32")]
fn format_url(file_name: &str) -> anyhow::Result<reqwest::Url> {
    let window = web_sys::window().ok_or_else(|| anyhow::anyhow!("No browser window"))?;
    let origin = window
        .location()
        .origin()
        .map_err(|_| anyhow::anyhow!("The page origin is unavailable"))?;
    let base = reqwest::Url::parse(&format!("{}/assets/", origin))?;
    Ok(base.join(file_name)?)
}

/// Reads the whole resource at `location`.
///
/// `http(s)` URLs are downloaded. Anything else is a file below `./assets`
/// on native (absolute paths are used as is) and an origin relative URL
/// below `/assets` in the browser.
pub async fn load_binary(location: &str) -> anyhow::Result<Vec<u8>> {
    if is_remote(location) {
        log::info!("Downloading {}", location);
        let response = reqwest::get(location).await?.error_for_status()?;
        return Ok(response.bytes().await?.to_vec());
    }

    #[cfg(target_arch = "wasm32")]
    let data = {
        let url = format_url(location)?;
        reqwest::get(url).await?.error_for_status()?.bytes().await?.to_vec()
    };
    #[cfg(not(target_arch = "wasm32"))]
    let data = {
        let path = std::path::Path::new(location);
        let path = if path.is_absolute() {
            path.to_path_buf()
        } else {
            std::path::Path::new("./").join("assets").join(location)
        };
        tokio::fs::read(&path)
            .await
            .map_err(|e| anyhow::anyhow!("Could not read {}: {}", path.display(), e))?
    };

    Ok(data)
}

/// Decodes a base64 `data:` URI. Returns `None` for any other URI.
pub fn decode_data_uri(uri: &str) -> Option<anyhow::Result<Vec<u8>>> {
    let rest = uri.strip_prefix("data:")?;
    let Some((header, payload)) = rest.split_once(',') else {
        return Some(Err(anyhow::anyhow!("Malformed data URI")));
    };
    if !header.ends_with(";base64") {
        return Some(Err(anyhow::anyhow!(
            "Only base64 data URIs are supported, got '{}'",
            header
        )));
    }
    Some(
        base64::engine::general_purpose::STANDARD
            .decode(payload)
            .map_err(anyhow::Error::from),
    )
}

/// Resolves `uri` against the location of the file that references it.
pub fn resolve_relative(base: Option<&str>, uri: &str) -> String {
    let Some(base) = base else {
        return uri.to_string();
    };
    if is_remote(uri) {
        return uri.to_string();
    }
    if is_remote(base) {
        return reqwest::Url::parse(base)
            .and_then(|b| b.join(uri))
            .map(|u| u.to_string())
            .unwrap_or_else(|_| uri.to_string());
    }
    match base.rfind('/') {
        Some(idx) => format!("{}/{}", &base[..idx], uri),
        None => uri.to_string(),
    }
}
