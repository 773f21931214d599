use std::collections::BTreeMap;
use std::env;
use std::path::{Path, PathBuf};
use std::sync::{PoisonError, RwLock};
use std::time::SystemTime;

use proc_macro2::Span;
use toml_edit::{Document, Item, Table};

/// The caller's `Cargo.toml`, used to spell paths that macro output can reach.
///
/// A derive in `vc_reflect_derive` must name `vc_reflect` the way the invoking
/// crate sees it:
///
/// 1. a direct `vc_reflect` dependency gives `::vc_reflect`;
/// 2. a dependency on the `vc_graphio` facade gives `::vc_graphio::reflect`;
/// 3. the same two checks run over `dev-dependencies`;
/// 4. anything else falls back to `::vc_reflect`.
///
/// Crates that derive on their own types add `extern crate self as vc_reflect;`
/// so rule 4 also holds inside `vc_reflect`.
#[derive(Debug)]
pub struct Manifest {
    document: Option<Document<Box<str>>>,
    modified: Option<SystemTime>,
}

const FACADE_NAME: &str = "vc_graphio";
const MEMBER_PREFIX: &str = "vc_";

impl Manifest {
    fn manifest_path() -> Option<PathBuf> {
        let mut path = PathBuf::from(env::var_os("CARGO_MANIFEST_DIR")?);
        path.push("Cargo.toml");
        path.exists().then_some(path)
    }

    fn modified_time(path: &Path) -> Option<SystemTime> {
        std::fs::metadata(path).and_then(|meta| meta.modified()).ok()
    }

    fn read(path: &Path) -> Option<Document<Box<str>>> {
        let text = std::fs::read_to_string(path).ok()?.into_boxed_str();
        Document::parse(text).ok()
    }

    fn absolute(segments: &[&str]) -> syn::Path {
        let mut path = syn::Path {
            leading_colon: Some(Default::default()),
            segments: Default::default(),
        };
        for segment in segments {
            path.segments
                .push(syn::Ident::new(segment, Span::call_site()).into());
        }
        path
    }

    fn lookup(deps: &Table, name: &str) -> Option<syn::Path> {
        if deps.contains_key(name) {
            return Some(Self::absolute(&[name]));
        }
        let module = name.strip_prefix(MEMBER_PREFIX)?;
        deps.contains_key(FACADE_NAME)
            .then(|| Self::absolute(&[FACADE_NAME, module]))
    }

    /// Returns the path under which crate `name` is reachable from the caller.
    pub fn get_crate_path(&self, name: &str) -> syn::Path {
        let Some(document) = &self.document else {
            return Self::absolute(&[name]);
        };
        for table in ["dependencies", "dev-dependencies"] {
            if let Some(Item::Table(deps)) = document.get(table)
                && let Some(path) = Self::lookup(deps, name)
            {
                return path;
            }
        }
        Self::absolute(&[name])
    }

    /// Runs `func` with the caller's manifest.
    ///
    /// Parsed manifests are cached per path and reparsed only when the file's
    /// modification time changes. Without a readable manifest, `func` sees an
    /// empty one and every lookup falls back to `::name`.
    pub fn shared<R>(func: impl FnOnce(&Self) -> R) -> R {
        static MANIFESTS: RwLock<BTreeMap<PathBuf, Manifest>> = RwLock::new(BTreeMap::new());

        let Some(path) = Self::manifest_path() else {
            return func(&Self::empty());
        };
        let modified = Self::modified_time(&path);

        {
            let cached = MANIFESTS.read().unwrap_or_else(PoisonError::into_inner);
            if let Some(manifest) = cached.get(&path)
                && manifest.modified == modified
            {
                return func(manifest);
            }
        }

        let manifest = Manifest {
            document: Self::read(&path),
            modified,
        };
        let result = func(&manifest);

        MANIFESTS
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(path, manifest);

        result
    }

    fn empty() -> Self {
        Manifest {
            document: None,
            modified: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::Manifest;
    use quote::ToTokens;

    fn manifest(text: &str) -> Manifest {
        Manifest {
            document: Some(toml_edit::Document::parse(Box::<str>::from(text)).unwrap()),
            modified: None,
        }
    }

    #[test]
    fn direct_dependency_wins() {
        let m = manifest("[dependencies]\nvc_reflect = \"0.0.1\"\nvc_graphio = \"0.0.1\"\n");
        let path = m.get_crate_path("vc_reflect");
        assert_eq!(path.to_token_stream().to_string(), ":: vc_reflect");
    }

    #[test]
    fn facade_dependency() {
        let m = manifest("[dev-dependencies]\nvc_graphio = { path = \"..\" }\n");
        let path = m.get_crate_path("vc_reflect");
        assert_eq!(path.to_token_stream().to_string(), ":: vc_graphio :: reflect");
    }

    #[test]
    fn fallback() {
        let m = manifest("");
        let path = m.get_crate_path("vc_reflect");
        assert_eq!(path.to_token_stream().to_string(), ":: vc_reflect");
    }
}
