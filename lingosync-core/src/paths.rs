//! Well-known filesystem locations.
//!
//! ```text
//! <base>/
//!   localized_data/
//!     <project>/
//!       <locale>.json
//! <temp_dir>/lingosync_run_info.json
//! <config_dir>/lingosync/config.yaml
//! ```

use std::path::{Component, Path, PathBuf};

use crate::types::{LocaleName, ProjectName};

pub const LOCALIZED_DATA_DIR: &str = "localized_data";
pub const RUN_INFO_FILE: &str = "lingosync_run_info.json";
pub const CONFIG_FILE: &str = "config.yaml";

/// `<base>/localized_data`
pub fn localized_dir(base: &Path) -> PathBuf {
    base.join(LOCALIZED_DATA_DIR)
}

/// `<base>/localized_data/<project>`
pub fn project_dir(base: &Path, project: &ProjectName) -> PathBuf {
    localized_dir(base).join(&project.0)
}

/// `<base>/localized_data/<project>/<locale>.json`. Pure, no I/O.
pub fn locale_file_path(base: &Path, project: &ProjectName, locale: &LocaleName) -> PathBuf {
    project_dir(base, project).join(format!("{}.json", locale.0))
}

/// True when `name` is a single ordinary path component: no separators,
/// no `.`/`..`, no root or drive prefix. Project and locale names must pass
/// this before they are joined below `localized_data`.
pub fn is_plain_component(name: &str) -> bool {
    if name.contains(['/', '\\']) {
        return false;
    }
    let mut components = Path::new(name).components();
    matches!(
        (components.next(), components.next()),
        (Some(Component::Normal(part)), None) if part == name
    )
}

/// Default location of the persisted run record, in the system temp dir.
pub fn run_info_path() -> PathBuf {
    std::env::temp_dir().join(RUN_INFO_FILE)
}

/// `<config_dir>/lingosync/config.yaml`, if the platform has a config dir.
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("lingosync").join(CONFIG_FILE))
}
