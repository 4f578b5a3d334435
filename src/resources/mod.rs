use crate::{
    data_structures::scene_graph::Node,
    resources::{
        fetch::{decode_data_uri, load_binary, resolve_relative},
        mesh::to_scene_node,
    },
};

/**
 * This module contains all logic for loading models from external files.
 *
 * Only geometry and base colours are read. Textures, skins and animations
 * are ignored because the placed model is drawn with a uniform material.
 */
pub mod fetch;
pub mod mesh;

/// Fetches and parses a glTF / GLB model. See [`fetch::load_binary`] for how
/// `location` is resolved.
pub async fn load_model_gltf(location: &str) -> anyhow::Result<Node> {
    let bytes = load_binary(location).await?;
    let node = load_model_gltf_from_bytes(&bytes, Some(location)).await?;
    log::info!(
        "Loaded model '{}' with {} nodes",
        location,
        node.node_count()
    );
    Ok(node)
}

/// Parses a glTF document. External buffers are resolved relative to `base`.
///
/// The default scene (or the first one) becomes the returned node. Scenes
/// with several root nodes are wrapped in a group.
pub async fn load_model_gltf_from_bytes(bytes: &[u8], base: Option<&str>) -> anyhow::Result<Node> {
    let gltf = gltf::Gltf::from_slice(bytes)?;

    // Load buffers
    let mut buffer_data: Vec<Vec<u8>> = Vec::new();
    for buffer in gltf.buffers() {
        match buffer.source() {
            gltf::buffer::Source::Bin => {
                let blob = gltf
                    .blob
                    .as_deref()
                    .ok_or_else(|| anyhow::anyhow!("GLB buffer {} has no binary chunk", buffer.index()))?;
                buffer_data.push(blob.into());
            }
            gltf::buffer::Source::Uri(uri) => {
                let bin = match decode_data_uri(uri) {
                    Some(decoded) => decoded?,
                    None => load_binary(&resolve_relative(base, uri)).await?,
                };
                buffer_data.push(bin);
            }
        }
    }

    let scene = gltf
        .default_scene()
        .or_else(|| gltf.scenes().next())
        .ok_or_else(|| anyhow::anyhow!("The model contains no scene"))?;

    let mut roots: Vec<Node> = scene
        .nodes()
        .map(|node| to_scene_node(node, &buffer_data))
        .collect();

    let root = if roots.len() == 1 {
        roots.remove(0)
    } else {
        let mut root = Node::group(scene.name().unwrap_or("scene"));
        root.children = roots;
        root
    };
    Ok(root)
}
