use std::path::{Path, PathBuf};

use anyhow::Context as _;

use crate::assets::data_url::{decode_data_url, encode_data_url};
use crate::assets::decode::{ImageRole, validate_input};
use crate::foundation::error::{PhotocardError, PhotocardResult};

/// One selectable template as listed to the gallery.
#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TemplateEntry {
    pub id: String,
    pub display_name: String,
    /// File path for built-ins, a `data:` URL for user uploads.
    pub path: String,
}

/// A template uploaded during this session. Lives only in memory.
#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct UserTemplate {
    pub id: String,
    pub name: String,
    pub payload: String,
}

/// `"gold-frame"` -> `"Gold Frame"`.
pub fn display_name_for(stem: &str) -> String {
    stem.split('-')
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect::<String>(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

/// List the `*.png` files of `dir` (case-insensitive extension), sorted by file name.
pub fn scan_template_dir(dir: &Path) -> PhotocardResult<Vec<TemplateEntry>> {
    let rd = std::fs::read_dir(dir)
        .with_context(|| format!("read template dir '{}'", dir.display()))?;

    let mut files: Vec<PathBuf> = Vec::new();
    for entry in rd {
        let entry = entry.with_context(|| format!("list template dir '{}'", dir.display()))?;
        let path = entry.path();
        let is_png = path
            .extension()
            .and_then(|e| e.to_str())
            .is_some_and(|e| e.eq_ignore_ascii_case("png"));
        if is_png && path.is_file() {
            files.push(path);
        }
    }
    files.sort();

    Ok(files
        .into_iter()
        .filter_map(|path| {
            let stem = path.file_stem()?.to_str()?.to_owned();
            Some(TemplateEntry {
                display_name: display_name_for(&stem),
                id: stem,
                path: path.to_string_lossy().into_owned(),
            })
        })
        .collect())
}

/// Built-in templates plus the user's session uploads.
#[derive(Clone, Debug, Default)]
pub struct TemplateCatalog {
    builtin: Vec<TemplateEntry>,
    user: Vec<UserTemplate>,
    next_user_id: u64,
    max_upload_bytes: usize,
}

impl TemplateCatalog {
    pub fn new(builtin: Vec<TemplateEntry>, max_upload_bytes: usize) -> Self {
        Self {
            builtin,
            user: Vec::new(),
            next_user_id: 1,
            max_upload_bytes,
        }
    }

    pub fn from_dir(dir: &Path, max_upload_bytes: usize) -> PhotocardResult<Self> {
        Ok(Self::new(scan_template_dir(dir)?, max_upload_bytes))
    }

    pub fn builtin(&self) -> &[TemplateEntry] {
        &self.builtin
    }

    pub fn user_templates(&self) -> &[UserTemplate] {
        &self.user
    }

    /// Built-ins first, then uploads in insertion order.
    pub fn entries(&self) -> Vec<TemplateEntry> {
        let user = self.user.iter().map(|t| TemplateEntry {
            id: t.id.clone(),
            display_name: t.name.clone(),
            path: t.payload.clone(),
        });
        self.builtin.iter().cloned().chain(user).collect()
    }

    /// Validate a PNG upload and store it as a data URL. Returns the new id.
    pub fn add_user(&mut self, name: &str, png: &[u8]) -> PhotocardResult<String> {
        let media = validate_input(
            ImageRole::Template,
            png,
            Some("image/png"),
            self.max_upload_bytes,
        )?;
        let id = format!("user-{}", self.next_user_id);
        self.next_user_id += 1;
        self.user.push(UserTemplate {
            id: id.clone(),
            name: name.to_owned(),
            payload: encode_data_url(media, png),
        });
        tracing::debug!(%id, "user template added");
        Ok(id)
    }

    /// Rename an upload. Built-ins are read-only, so their ids return `false`.
    pub fn rename_user(&mut self, id: &str, name: &str) -> bool {
        match self.user.iter_mut().find(|t| t.id == id) {
            Some(t) => {
                t.name = name.to_owned();
                true
            }
            None => false,
        }
    }

    pub fn remove_user(&mut self, id: &str) -> bool {
        let before = self.user.len();
        self.user.retain(|t| t.id != id);
        self.user.len() != before
    }

    /// Raw PNG bytes for any entry, read from disk or unpacked from its data URL.
    pub fn load_bytes(&self, id: &str) -> PhotocardResult<Vec<u8>> {
        if let Some(t) = self.user.iter().find(|t| t.id == id) {
            let (_, bytes) = decode_data_url(&t.payload)?;
            return Ok(bytes);
        }
        let entry = self
            .builtin
            .iter()
            .find(|t| t.id == id)
            .ok_or_else(|| PhotocardError::validation(format!("unknown template '{id}'")))?;
        let bytes = std::fs::read(&entry.path)
            .with_context(|| format!("read template '{}'", entry.path))?;
        Ok(bytes)
    }
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use super::*;

    fn tiny_png() -> Vec<u8> {
        let img = image::RgbaImage::from_pixel(2, 2, image::Rgba([0, 0, 0, 0]));
        let mut buf = Vec::new();
        image::DynamicImage::ImageRgba8(img)
            .write_to(&mut Cursor::new(&mut buf), image::ImageFormat::Png)
            .unwrap();
        buf
    }

    #[test]
    fn display_names_are_title_cased() {
        assert_eq!(display_name_for("gold-frame"), "Gold Frame");
        assert_eq!(display_name_for("logo"), "Logo");
        assert_eq!(display_name_for("a--b"), "A  B");
    }

    #[test]
    fn scan_lists_png_files_only_sorted() {
        let dir = PathBuf::from("target").join("catalog_scan");
        let _ = std::fs::remove_dir_all(&dir);
        std::fs::create_dir_all(&dir).unwrap();
        std::fs::write(dir.join("zebra-stripes.png"), tiny_png()).unwrap();
        std::fs::write(dir.join("Alpha.PNG"), tiny_png()).unwrap();
        std::fs::write(dir.join("notes.txt"), b"x").unwrap();

        let entries = scan_template_dir(&dir).unwrap();
        let ids: Vec<_> = entries.iter().map(|e| e.id.as_str()).collect();
        assert_eq!(ids, ["Alpha", "zebra-stripes"]);
        assert_eq!(entries[1].display_name, "Zebra Stripes");

        let catalog = TemplateCatalog::new(entries, 1 << 20);
        assert_eq!(catalog.load_bytes("Alpha").unwrap(), tiny_png());
    }

    #[test]
    fn missing_dir_is_an_error() {
        assert!(scan_template_dir(Path::new("target/definitely-not-here")).is_err());
    }

    #[test]
    fn user_templates_round_through_data_urls() {
        let mut catalog = TemplateCatalog::new(Vec::new(), 1 << 20);
        let id = catalog.add_user("mine.png", &tiny_png()).unwrap();
        assert!(catalog.entries()[0].path.starts_with("data:image/png;base64,"));
        assert_eq!(catalog.load_bytes(&id).unwrap(), tiny_png());

        assert!(catalog.rename_user(&id, "Party"));
        assert_eq!(catalog.entries()[0].display_name, "Party");
        assert!(catalog.remove_user(&id));
        assert!(catalog.entries().is_empty());
        assert!(!catalog.remove_user(&id));
    }

    #[test]
    fn user_uploads_are_validated() {
        let mut catalog = TemplateCatalog::new(Vec::new(), 16);
        let err = catalog.add_user("big.png", &tiny_png()).unwrap_err();
        assert!(err.is_validation());

        let mut catalog = TemplateCatalog::new(Vec::new(), 1 << 20);
        assert!(catalog.add_user("x.jpg", b"\xff\xd8\xff\xe0 jpeg").is_err());
        assert!(catalog.user_templates().is_empty());
    }

    #[test]
    fn builtins_cannot_be_renamed() {
        let builtin = vec![TemplateEntry {
            id: "logo".into(),
            display_name: "Logo".into(),
            path: "logo.png".into(),
        }];
        let mut catalog = TemplateCatalog::new(builtin, 1 << 20);
        assert!(!catalog.rename_user("logo", "x"));
        assert!(!catalog.remove_user("logo"));
        assert_eq!(catalog.builtin().len(), 1);
    }
}
