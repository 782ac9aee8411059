//! Render Outputs
//!
//! Translates an [`Output`] into the native driver and pixel filter nodes it
//! needs, plus the entry it contributes to the options `outputs` array:
//!
//! ```text
//! <channel> <TYPE> <filter node> <driver node>[ <layer name>]
//! ```
//!
//! `lpe` outputs additionally register a light path expression under the
//! output's name, which then serves as its channel.

use prism_core::{Data, PrismError, Result};
use prism_scene::Output;

use crate::native::{EntryKind, ParamValue};
use crate::scope::{NodeScope, OwnedNode};

/// Output parameters consumed by the translation itself rather than passed
/// to the driver.
const RESERVED: &[&str] = &["camera", "filter", "filterwidth", "layerName"];

const DEFAULT_FILTER: &str = "gaussian";

/// What an output writes, parsed from [`Output::data`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputData {
    pub channel: String,
    pub ty: &'static str,
    pub lpe: Option<String>,
}

impl OutputData {
    pub fn parse(name: &str, data: &str) -> Result<Self> {
        let invalid = || PrismError::InvalidOutputData {
            output: name.to_string(),
            data: data.to_string(),
        };
        let plain = |channel: &str, ty| Self {
            channel: channel.to_string(),
            ty,
            lpe: None,
        };

        let mut tokens = data.splitn(2, ' ');
        let kind = tokens.next().unwrap_or_default();
        let rest = tokens.next().map(str::trim).filter(|r| !r.is_empty());

        Ok(match (kind, rest) {
            ("rgb", None) => plain("RGB", "RGB"),
            ("rgba", None) => plain("RGBA", "RGBA"),
            ("float", Some(channel)) => plain(channel, "FLOAT"),
            ("color", Some(channel)) => plain(channel, "RGB"),
            ("vector", Some(channel)) => plain(channel, "VECTOR"),
            ("lpe", Some(expression)) => Self {
                channel: name.to_string(),
                ty: "RGB",
                lpe: Some(format!("{name} {expression}")),
            },
            _ => return Err(invalid()),
        })
    }
}

/// The native nodes behind one output.
#[derive(Debug)]
pub struct OutputNodes {
    name: String,
    driver: OwnedNode,
    filter: OwnedNode,
    data: OutputData,
    layer: Option<String>,
    camera: Option<String>,
}

impl OutputNodes {
    /// Checks `output` against the registry without creating anything.
    /// Returns the parsed data and the driver and filter entry names.
    pub fn validate(scope: &NodeScope, name: &str, output: &Output) -> Result<(OutputData, String, String)> {
        let data = OutputData::parse(name, &output.data)?;

        let driver_entry = format!("driver_{}", output.driver_type);
        if scope.registry().entry(&driver_entry).is_none_or(|e| e.kind() != EntryKind::Driver) {
            return Err(PrismError::UnknownDriver {
                output: name.to_string(),
                driver: output.driver_type.clone(),
            });
        }
        let filter_type = output.parameters.get_str("filter", DEFAULT_FILTER);
        let filter_entry = format!("{filter_type}_filter");
        if scope.registry().entry(&filter_entry).is_none_or(|e| e.kind() != EntryKind::Filter) {
            return Err(PrismError::UnknownFilter {
                output: name.to_string(),
                filter: filter_type.to_string(),
            });
        }
        Ok((data, driver_entry, filter_entry))
    }

    pub fn new(scope: &NodeScope, name: &str, output: &Output) -> Result<Self> {
        let (data, driver_entry, filter_entry) = Self::validate(scope, name, output)?;
        let params = &output.parameters;

        let driver = scope.create(&driver_entry, &format!("prism:driver:{name}"))?;
        scope.set(driver.key(), "filename", output.file_name.as_str());
        let entry = scope.entry(&driver_entry)?;
        for (param, value) in params.iter() {
            if RESERVED.contains(&param.as_str()) {
                continue;
            }
            match ParamValue::from_data(value) {
                Some(value) if entry.has_param(param) => {
                    scope.set(driver.key(), param, value);
                }
                _ => scope.messages().debug(
                    "prism::Output",
                    format!("\"{name}\" : ignoring parameter \"{param}\" unknown to {driver_entry}"),
                ),
            }
        }

        let filter = scope.create(&filter_entry, &format!("prism:filter:{name}"))?;
        if let Some(width) = params.get("filterwidth").and_then(Data::as_f32) {
            scope.set(filter.key(), "width", width);
        }

        Ok(Self {
            name: name.to_string(),
            driver,
            filter,
            data,
            layer: params
                .get("layerName")
                .and_then(Data::as_str)
                .filter(|l| !l.is_empty())
                .map(str::to_string),
            camera: output.camera().map(str::to_string),
        })
    }

    #[inline]
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The camera this output renders from, when it overrides the global one.
    #[inline]
    #[must_use]
    pub fn camera(&self) -> Option<&str> {
        self.camera.as_deref()
    }

    #[inline]
    #[must_use]
    pub fn data(&self) -> &OutputData {
        &self.data
    }

    /// The entry for the options `outputs` array.
    #[must_use]
    pub fn output_string(&self, scope: &NodeScope) -> String {
        let universe = scope.universe();
        let filter = universe.name(self.filter.key()).unwrap_or_default();
        let driver = universe.name(self.driver.key()).unwrap_or_default();
        let mut s = format!("{} {} {filter} {driver}", self.data.channel, self.data.ty);
        if let Some(layer) = &self.layer {
            s.push(' ');
            s.push_str(layer);
        }
        s
    }

    /// Removes the driver and filter nodes whatever the ownership policy,
    /// so a replacement output can reuse their names.
    pub fn destroy(self) {
        self.driver.destroy();
        self.filter.destroy();
    }
}
