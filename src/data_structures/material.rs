/// Surface description of a mesh.
///
/// Colours are linear RGBA. `opacity` is multiplied into the alpha channel by
/// the shader, `transparent` routes the mesh through the blending pipeline and
/// `depth_write` controls whether it occludes what is drawn after it.
#[derive(Clone, Debug, PartialEq)]
pub struct Material {
    pub name: String,
    pub base_color: [f32; 4],
    pub opacity: f32,
    pub transparent: bool,
    pub depth_write: bool,
}

impl Material {
    pub fn new(name: &str, base_color: [f32; 4]) -> Self {
        Self {
            name: name.to_string(),
            base_color,
            ..Default::default()
        }
    }

    /// Marks the material as blended and applies a uniform opacity.
    ///
    /// Depth is only written while the surface is fully opaque.
    pub fn set_opacity(&mut self, opacity: f32) {
        self.transparent = true;
        self.opacity = opacity;
        self.depth_write = opacity >= 1.0;
    }

    /// Final RGBA as consumed by the fragment shader.
    pub fn color(&self) -> [f32; 4] {
        let [r, g, b, a] = self.base_color;
        [r, g, b, a * self.opacity]
    }
}

impl Default for Material {
    fn default() -> Self {
        Self {
            name: String::from("default"),
            base_color: [1.0, 1.0, 1.0, 1.0],
            opacity: 1.0,
            transparent: false,
            depth_write: true,
        }
    }
}
