//! Curation constants and layered runtime configuration

use crate::io::error::{Result, invalid_parameter};
use figment::Figment;
use figment::providers::{Env, Format, Serialized, Toml};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

// Grid layout defaults
/// Maximum thumbnails per montage row
pub const DEFAULT_COLUMNS: usize = 8;
/// Maximum montage rows per page
pub const DEFAULT_MAX_ROWS: usize = 10;
/// Side length of the square crop around each cilium, in image pixels
pub const DEFAULT_ROI_SIZE: u32 = 64;
/// Crop sizes the reviewer can pick from
pub const ROI_SIZES: [u32; 4] = [32, 64, 128, 256];
/// Upscaling factor applied to each crop
pub const DEFAULT_SCALE: u32 = 2;
/// Largest supported upscaling factor
pub const MAX_SCALE: u32 = 3;
/// Width of the grid lines between thumbnails
pub const DEFAULT_BORDER_WIDTH: u32 = 4;
/// Screen width the montage has to fit on
pub const DEFAULT_SCREEN_WIDTH: u32 = 1920;
/// Screen height the montage has to fit on
pub const DEFAULT_SCREEN_HEIGHT: u32 = 1080;
/// Horizontal space reserved for window decorations
pub const SCREEN_MARGIN_WIDTH: u32 = 100;
/// Vertical space reserved for window decorations and the toolbar
pub const SCREEN_MARGIN_HEIGHT: u32 = 200;

// Session splitting
/// Minimum number of ROIs reviewed per session (0 keeps everything in one session)
pub const DEFAULT_ROI_PER_SESSION: usize = 500;

// Contrast adjustment
/// Fraction of the channel range added on both sides of the auto window
pub const DEFAULT_BUFFER_PERCENT: f64 = 0.25;
/// Lower cumulative histogram cutoff for auto adjustment
pub const AUTO_LOWER_PERCENTILE: f64 = 0.01;
/// Upper cumulative histogram cutoff for auto adjustment
pub const AUTO_UPPER_PERCENTILE: f64 = 0.99;
/// Number of histogram bins used for percentile cutoffs
pub const HISTOGRAM_BINS: usize = 256;
/// Fixed display window minimum for channels 1 to 3
pub const DEFAULT_BC_MIN: [u16; 3] = [0, 5000, 5000];
/// Fixed display window maximum for channels 1 to 3
pub const DEFAULT_BC_MAX: [u16; 3] = [600, 30000, 30000];
/// Percentage of saturated pixels for channels 1 to 3
pub const DEFAULT_SATURATION: [f64; 3] = [0.2, 0.2, 0.3];

// File layout
/// Marker written in front of rejected rows
pub const COMMENT_MARKER: &str = "# ";
/// Column (1-based) receiving the source file name in stripped output
pub const DEFAULT_SRC_COLUMN: usize = 1;
/// Prefix of per-run archive directories
pub const GROUP_PREFIX: &str = "Group_";
/// Name of the persisted session plan inside the input directory
pub const STATE_FILE_NAME: &str = ".session_state.json";
/// Suffix given to state files that could not be understood
pub const INVALID_STATE_SUFFIX: &str = ".invalid";
/// Version tag written into the session plan
pub const STATE_VERSION: &str = "1";
/// Running log of options and session outcomes inside a group directory
pub const README_FILE_NAME: &str = "README.txt";
/// Subdirectory of the group directory receiving montage images
pub const MONTAGE_DIR_NAME: &str = "montages";
/// Suffix added to the stem of stripped archive copies
pub const STRIPPED_SUFFIX: &str = "-stripped";
/// Suffix added to the stem of archived pre-review copies
pub const WORKING_SUFFIX: &str = "-working";
/// Timestamp format of history annotations
pub const HISTORY_TIME_FORMAT: &str = "%m/%d/%Y @ %H:%M";
/// Timestamp format used in the README
pub const README_TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

// Configuration sources
/// Per-input-directory configuration file
pub const LOCAL_CONFIG_FILE_NAME: &str = "cilia-curate.toml";
/// Directory under the platform config dir holding the user configuration
pub const USER_CONFIG_DIR_NAME: &str = "cilia-curate";
/// File name of the user configuration
pub const USER_CONFIG_FILE_NAME: &str = "config.toml";
/// Prefix of configuration environment variables
pub const ENV_PREFIX: &str = "CILIA_CURATE_";
/// Environment variable holding the tracing filter
pub const LOG_ENV: &str = "CILIA_CURATE_LOG";

// Progress bar display settings
/// Width of progress bars in characters
pub const PROGRESS_BAR_WIDTH: u16 = 40;

/// How crop images are mapped to 8-bit display values
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum AdjustMode {
    /// Percentile window widened by `buffer_percent`
    Auto,
    /// Fixed per-channel `bc_min`/`bc_max` window
    MinMax,
    /// Clip a percentage of saturated pixels per channel
    Saturation,
    /// Stretch each channel between its own minimum and maximum
    #[serde(rename = "none")]
    Off,
}

impl AdjustMode {
    /// Name used in configuration files and the README
    pub const fn name(self) -> &'static str {
        match self {
            Self::Auto => "auto",
            Self::MinMax => "min-max",
            Self::Saturation => "saturation",
            Self::Off => "none",
        }
    }
}

/// Options controlling layout, session splitting, rendering and output
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
// Each flag is an independent user option persisted in the session state
#[allow(clippy::struct_excessive_bools)]
pub struct CurationConfig {
    /// Maximum thumbnails per row
    pub columns: usize,
    /// Maximum rows per page
    pub max_rows: usize,
    /// Crop side length in image pixels
    pub roi_size: u32,
    /// Crop upscaling factor
    pub scale: u32,
    /// Grid line width in montage pixels
    pub border_width: u32,
    /// Screen width used to limit the columns
    pub screen_width: u32,
    /// Screen height used to limit the rows
    pub screen_height: u32,
    /// Minimum ROIs per session, 0 for a single session
    pub roi_per_session: usize,
    /// Contrast adjustment mode
    pub adjust: AdjustMode,
    /// Auto window buffer as a fraction of the channel range
    pub buffer_percent: f64,
    /// Per-channel window minimum for `min-max`
    pub bc_min: [u16; 3],
    /// Per-channel window maximum for `min-max`
    pub bc_max: [u16; 3],
    /// Per-channel saturated percentage for `saturation`
    pub saturation: [f64; 3],
    /// 1-based column receiving the source name in stripped copies
    pub src_column: usize,
    /// Write stripped copies tab separated instead of comma separated
    pub tab_delimited: bool,
    /// Add a dated line to the `History:` section of rewritten files
    pub record_history: bool,
    /// Include rows that are already commented out
    pub revisit_culled: bool,
    /// Copy rewritten files into the group directory
    pub archive: bool,
}

impl Default for CurationConfig {
    fn default() -> Self {
        Self {
            columns: DEFAULT_COLUMNS,
            max_rows: DEFAULT_MAX_ROWS,
            roi_size: DEFAULT_ROI_SIZE,
            scale: DEFAULT_SCALE,
            border_width: DEFAULT_BORDER_WIDTH,
            screen_width: DEFAULT_SCREEN_WIDTH,
            screen_height: DEFAULT_SCREEN_HEIGHT,
            roi_per_session: DEFAULT_ROI_PER_SESSION,
            adjust: AdjustMode::Auto,
            buffer_percent: DEFAULT_BUFFER_PERCENT,
            bc_min: DEFAULT_BC_MIN,
            bc_max: DEFAULT_BC_MAX,
            saturation: DEFAULT_SATURATION,
            src_column: DEFAULT_SRC_COLUMN,
            tab_delimited: false,
            record_history: false,
            revisit_culled: false,
            archive: true,
        }
    }
}

/// Files consulted on top of the built-in defaults
#[derive(Debug, Clone, Default)]
pub struct ConfigSources {
    /// Directory whose `cilia-curate.toml` is merged
    pub input_dir: Option<PathBuf>,
    /// File given with `--config`
    pub explicit: Option<PathBuf>,
    /// Skip the per-user configuration file
    pub skip_user: bool,
}

impl ConfigSources {
    /// Sources for a run over `input_dir`
    pub fn for_input(input_dir: &Path) -> Self {
        Self {
            input_dir: Some(input_dir.to_path_buf()),
            ..Self::default()
        }
    }
}

/// Location of the per-user configuration file, if the platform has one
pub fn user_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join(USER_CONFIG_DIR_NAME).join(USER_CONFIG_FILE_NAME))
}

impl CurationConfig {
    /// Layer defaults, configuration files and environment variables
    ///
    /// Later layers override earlier ones: user file, input directory file,
    /// explicit file, then `CILIA_CURATE_*` variables.
    pub fn figment(sources: &ConfigSources) -> Figment {
        let mut figment = Figment::from(Serialized::defaults(Self::default()));

        if !sources.skip_user
            && let Some(path) = user_config_path()
        {
            figment = figment.merge(Toml::file(path));
        }
        if let Some(dir) = &sources.input_dir {
            figment = figment.merge(Toml::file(dir.join(LOCAL_CONFIG_FILE_NAME)));
        }
        if let Some(path) = &sources.explicit {
            figment = figment.merge(Toml::file(path));
        }

        figment.merge(Env::prefixed(ENV_PREFIX).ignore(&["log"]))
    }

    /// Extract and validate the layered configuration
    ///
    /// # Errors
    ///
    /// Returns a configuration error when a layer cannot be parsed, or an
    /// invalid parameter error when the explicit file is missing or a value
    /// is out of range
    pub fn load(sources: &ConfigSources) -> Result<Self> {
        if let Some(path) = &sources.explicit
            && !path.is_file()
        {
            return Err(invalid_parameter(
                "config",
                &path.display(),
                &"configuration file does not exist",
            ));
        }
        let config: Self = Self::figment(sources).extract()?;
        config.validate()?;
        tracing::debug!(?config, "configuration loaded");
        Ok(config)
    }

    /// Check every option against its allowed range
    ///
    /// # Errors
    ///
    /// Returns an invalid parameter error naming the first offending option
    pub fn validate(&self) -> Result<()> {
        if !ROI_SIZES.contains(&self.roi_size) {
            return Err(invalid_parameter(
                "roi_size",
                &self.roi_size,
                &format!("must be one of {ROI_SIZES:?}"),
            ));
        }
        if !(1..=MAX_SCALE).contains(&self.scale) {
            return Err(invalid_parameter(
                "scale",
                &self.scale,
                &format!("must be between 1 and {MAX_SCALE}"),
            ));
        }
        if self.columns == 0 {
            return Err(invalid_parameter("columns", &self.columns, &"must be positive"));
        }
        if self.max_rows == 0 {
            return Err(invalid_parameter("max_rows", &self.max_rows, &"must be positive"));
        }
        if self.src_column == 0 {
            return Err(invalid_parameter(
                "src_column",
                &self.src_column,
                &"columns are numbered from 1",
            ));
        }
        if !(0.0..=1.0).contains(&self.buffer_percent) {
            return Err(invalid_parameter(
                "buffer_percent",
                &self.buffer_percent,
                &"must be between 0 and 1",
            ));
        }
        for (min, max) in self.bc_min.iter().zip(&self.bc_max) {
            if min >= max {
                return Err(invalid_parameter(
                    "bc_min",
                    &min,
                    &format!("must be below bc_max ({max})"),
                ));
            }
        }
        if let Some(value) = self
            .saturation
            .iter()
            .find(|value| !(0.0..100.0).contains(*value))
        {
            return Err(invalid_parameter(
                "saturation",
                value,
                &"must be a percentage below 100",
            ));
        }
        Ok(())
    }
}
