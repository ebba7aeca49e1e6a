/// Asset collaborator: resolves thumbnail references to textures.
///
/// The terminal renderer cannot show images, so a texture is just a
/// resolved name the panel displays. Failures never block the flow: a
/// missing start thumbnail becomes the "Video Not Found" placeholder and a
/// missing end thumbnail means the panel keeps its start texture.

use std::path::PathBuf;

use tracing::warn;

pub const PLACEHOLDER_LABEL: &str = "Video Not Found";

#[derive(Clone, PartialEq, Debug)]
pub enum Texture {
    /// Local image file; `name` is what the panel shows.
    Image { name: String },
    /// Remote reference, taken on trust.
    Remote { name: String },
    Placeholder,
}

impl Texture {
    pub fn label(&self) -> &str {
        match self {
            Texture::Image { name } | Texture::Remote { name } => name,
            Texture::Placeholder => PLACEHOLDER_LABEL,
        }
    }
}

pub trait AssetSource {
    /// Resolve a reference, or `None` if it cannot be loaded.
    fn texture(&self, reference: &str) -> Option<Texture>;
}

/// Resolves references against a root directory.
pub struct FileAssets {
    root: PathBuf,
}

impl FileAssets {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        FileAssets { root: root.into() }
    }
}

fn display_name(reference: &str) -> String {
    let last = reference.rsplit('/').next().unwrap_or(reference);
    let stem = last.split('.').next().unwrap_or(last);
    stem.replace(['-', '_'], " ")
}

impl AssetSource for FileAssets {
    fn texture(&self, reference: &str) -> Option<Texture> {
        if reference.starts_with("http://") || reference.starts_with("https://") {
            return Some(Texture::Remote { name: display_name(reference) });
        }
        let path = self.root.join(reference);
        path.is_file().then(|| Texture::Image { name: display_name(reference) })
    }
}

/// Start thumbnail, falling back to the placeholder.
pub fn start_texture(assets: &dyn AssetSource, reference: &str) -> Texture {
    assets.texture(reference).unwrap_or_else(|| {
        warn!(reference, "thumbnail failed to load, using placeholder");
        Texture::Placeholder
    })
}

/// End thumbnail, or `None` when absent or unloadable.
pub fn end_texture(assets: &dyn AssetSource, reference: Option<&str>) -> Option<Texture> {
    let reference = reference?;
    let texture = assets.texture(reference);
    if texture.is_none() {
        warn!(reference, "end thumbnail failed to load, keeping start thumbnail");
    }
    texture
}
