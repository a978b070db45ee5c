//! RouteCatalog - Route definitions keyed by route identifier
//!
//! Reference polylines are loaded from data files instead of being compiled in, one entry
//! per supported highway. Two formats are understood:
//!
//! - JSON: `{"routes": [{"id": "BR-116", "points": [{"lat": .., "lon": ..}, ..]}]}`
//! - GPX: every track becomes a route named after the track (or the file stem when the
//!   track has no name); the track's segments are concatenated in order.

use crate::{ChainageError, GeoPoint, Result, RouteModel};

use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::io::Read;
use std::path::Path;
use std::sync::Arc;

/// One route as stored in a JSON catalog file
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RouteDefinition {
    /// Route identifier, e.g. "BR-116"
    pub id: String,
    /// Ordered reference points
    pub points: Vec<GeoPoint>,
}

/// On-disk JSON layout
#[derive(Debug, Serialize, Deserialize)]
struct CatalogFile {
    routes: Vec<RouteDefinition>,
}

/// Immutable-after-load set of routes, selected by identifier
#[derive(Clone, Debug, Default)]
pub struct RouteCatalog {
    routes: BTreeMap<String, Arc<RouteModel>>,
}

#[cfg_attr(feature = "profiling", profiling::all_functions)]
impl RouteCatalog {
    /// Create an empty catalog
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a catalog from already parsed definitions
    pub fn from_definitions(definitions: Vec<RouteDefinition>) -> Result<Self> {
        let mut catalog = Self::new();
        for definition in definitions {
            catalog.insert(RouteModel::new(definition.id, definition.points)?)?;
        }
        Ok(catalog)
    }

    /// Parse a JSON catalog document
    pub fn from_json_str(json: &str) -> Result<Self> {
        let file: CatalogFile = serde_json::from_str(json)?;
        Self::from_definitions(file.routes)
    }

    /// Parse a JSON catalog from a reader
    pub fn from_json_reader<R: Read>(reader: R) -> Result<Self> {
        let file: CatalogFile = serde_json::from_reader(reader)?;
        Self::from_definitions(file.routes)
    }

    /// Parse GPX data, one route per track.
    ///
    /// `fallback_id` names tracks that carry no `<name>`. Unnamed tracks are numbered among
    /// themselves: the first gets `fallback_id`, the next `fallback_id-1`, and so on.
    pub fn from_gpx(gpx: &gpx::Gpx, fallback_id: &str) -> Result<Self> {
        let mut catalog = Self::new();
        let mut unnamed = 0u32;
        for track in &gpx.tracks {
            let id = match &track.name {
                Some(name) if !name.trim().is_empty() => name.trim().to_string(),
                _ => {
                    let id = match unnamed {
                        0 => fallback_id.to_string(),
                        n => format!("{fallback_id}-{n}"),
                    };
                    unnamed += 1;
                    id
                }
            };

            let points: Vec<GeoPoint> = track
                .segments
                .iter()
                .flat_map(|segment| segment.points.iter().map(GeoPoint::from))
                .collect();

            catalog.insert(RouteModel::new(id, points)?)?;
        }
        Ok(catalog)
    }

    /// Load a catalog file, choosing the format from the extension (`.gpx` or JSON)
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let file = std::fs::File::open(path)?;
        let reader = std::io::BufReader::new(file);

        let is_gpx = path
            .extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| ext.eq_ignore_ascii_case("gpx"));

        let catalog = if is_gpx {
            let stem = path
                .file_stem()
                .and_then(|stem| stem.to_str())
                .unwrap_or("route");
            Self::from_gpx(&gpx::read(reader)?, stem)?
        } else {
            Self::from_json_reader(reader)?
        };

        tracing::info!(
            path = %path.display(),
            routes = catalog.len(),
            "Loaded route catalog"
        );
        Ok(catalog)
    }

    /// Load and merge several catalog files in parallel
    pub fn load_from_files<P: AsRef<Path> + Send + Sync>(paths: Vec<P>) -> Result<Self> {
        let catalogs: Result<Vec<RouteCatalog>> =
            paths.into_par_iter().map(Self::load_from_file).collect();

        let mut merged = Self::new();
        for catalog in catalogs? {
            merged.merge(catalog)?;
        }
        Ok(merged)
    }

    /// Add a route; fails on an identifier that is already present
    pub fn insert(&mut self, route: RouteModel) -> Result<Arc<RouteModel>> {
        if self.routes.contains_key(route.id()) {
            return Err(ChainageError::DuplicateRoute(route.id().to_string()));
        }
        let route = Arc::new(route);
        self.routes.insert(route.id().to_string(), Arc::clone(&route));
        Ok(route)
    }

    /// Move every route of `other` into this catalog
    pub fn merge(&mut self, other: RouteCatalog) -> Result<()> {
        for (id, route) in other.routes {
            if self.routes.contains_key(&id) {
                return Err(ChainageError::DuplicateRoute(id));
            }
            self.routes.insert(id, route);
        }
        Ok(())
    }

    /// Look up a route by identifier
    pub fn get(&self, id: &str) -> Result<Arc<RouteModel>> {
        self.routes
            .get(id)
            .cloned()
            .ok_or_else(|| ChainageError::UnknownRoute(id.to_string()))
    }

    /// All route identifiers in sorted order
    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.routes.keys().map(String::as_str)
    }

    /// Number of routes
    #[inline]
    pub fn len(&self) -> usize {
        self.routes.len()
    }

    /// Check if the catalog is empty
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }
}
