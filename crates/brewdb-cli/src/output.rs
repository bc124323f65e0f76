//! Reading and writing the JSON catalog file.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use anyhow::Context;

use brewdb_core::CanonicalProduct;

/// Products from a previous run's output. A missing file is an empty catalog.
///
/// # Errors
///
/// Returns an error if the file exists but cannot be read or is not a JSON
/// array of products.
pub(crate) fn load_existing(path: &Path) -> anyhow::Result<Vec<CanonicalProduct>> {
    let content = match std::fs::read_to_string(path) {
        Ok(content) => content,
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => {
            return Err(e).with_context(|| format!("failed to read {}", path.display()));
        }
    };
    serde_json::from_str(&content)
        .with_context(|| format!("{} is not a valid product catalog", path.display()))
}

/// Writes `products` as pretty JSON. The file is written next to `path` and
/// renamed over it, so readers never see a half-written catalog.
///
/// # Errors
///
/// Returns an error if serialization, the write, or the rename fails.
pub(crate) fn write_products(path: &Path, products: &[CanonicalProduct]) -> anyhow::Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("failed to create {}", parent.display()))?;
    }

    let mut json = serde_json::to_vec_pretty(products).context("failed to serialize products")?;
    json.push(b'\n');

    let tmp = temp_path(path);
    std::fs::write(&tmp, &json).with_context(|| format!("failed to write {}", tmp.display()))?;
    if let Err(e) = std::fs::rename(&tmp, path) {
        let _ = std::fs::remove_file(&tmp);
        return Err(e).with_context(|| format!("failed to replace {}", path.display()));
    }
    Ok(())
}

fn temp_path(path: &Path) -> PathBuf {
    let mut name = path
        .file_name()
        .map_or_else(|| "output.json".into(), ToOwned::to_owned);
    name.push(".tmp");
    path.with_file_name(name)
}

#[cfg(test)]
mod tests {
    use super::*;

    use brewdb_core::SourceId;
    use rust_decimal::Decimal;

    fn scratch_dir(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("brewdb-output-{}-{name}", std::process::id()));
        let _ = std::fs::remove_dir_all(&dir);
        std::fs::create_dir_all(&dir).unwrap();
        dir
    }

    fn product(id: &str) -> CanonicalProduct {
        CanonicalProduct {
            source: SourceId::Liquorland,
            id: id.to_owned(),
            name: "Coopers Pale Ale Bottle 375mL".to_owned(),
            brand: "Coopers".to_owned(),
            description: String::new(),
            price: Some(Decimal::new(650, 2)),
            member_price: None,
            discount: None,
            unit_price: None,
            volume_ml: Some(375),
            unit: Some("Each".to_owned()),
            rating_average: Some(4.5),
            rating_total: Some(20),
            image_urls: vec!["https://example.com/a.jpg".to_owned()],
            product_url: format!("https://www.liquorland.com.au/beer/coopers_{id}"),
            variants: Vec::new(),
        }
    }

    #[test]
    fn missing_file_is_empty_catalog() {
        let dir = scratch_dir("missing");
        assert!(load_existing(&dir.join("nope.json")).unwrap().is_empty());
    }

    #[test]
    fn written_catalog_loads_back() {
        let dir = scratch_dir("written");
        let path = dir.join("nested").join("output.json");
        let products = vec![product("1"), product("2")];

        write_products(&path, &products).unwrap();

        assert_eq!(load_existing(&path).unwrap(), products);
        assert!(!dir.join("nested").join("output.json.tmp").exists());
        let raw = std::fs::read_to_string(&path).unwrap();
        assert!(raw.contains("\"price\": \"6.50\""), "got: {raw}");
        assert!(raw.contains("\"member_price\": null"));
    }

    #[test]
    fn rewrite_replaces_previous_contents() {
        let dir = scratch_dir("rewrite");
        let path = dir.join("output.json");
        write_products(&path, &[product("1"), product("2")]).unwrap();
        write_products(&path, &[product("3")]).unwrap();

        let ids: Vec<_> = load_existing(&path).unwrap().into_iter().map(|p| p.id).collect();
        assert_eq!(ids, vec!["3"]);
    }

    #[test]
    fn corrupt_file_is_an_error() {
        let dir = scratch_dir("corrupt");
        let path = dir.join("output.json");
        std::fs::write(&path, "{not json").unwrap();
        let err = load_existing(&path).unwrap_err();
        assert!(err.to_string().contains("not a valid product catalog"));
    }

    #[test]
    fn temp_file_sits_next_to_target() {
        assert_eq!(
            temp_path(Path::new("/data/output.json")),
            PathBuf::from("/data/output.json.tmp")
        );
    }
}
