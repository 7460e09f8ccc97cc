use crate::common::*;

/// Capability flags that decide which layer variants the factories may build.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct LayerConfig {
    /// Layers should be friendly to ahead-of-time export.
    pub exportable: bool,
    /// Layers should be compatible with script-mode compilation.
    pub scriptable: bool,
    /// Build the export-oriented "SAME" convolution when `exportable` is set.
    pub export_conv: bool,
}

impl LayerConfig {
    pub fn exportable(self, exportable: bool) -> Self {
        Self { exportable, ..self }
    }

    pub fn scriptable(self, scriptable: bool) -> Self {
        Self { scriptable, ..self }
    }

    pub fn export_conv(self, export_conv: bool) -> Self {
        Self {
            export_conv,
            ..self
        }
    }

    /// Whether "SAME" convolutions are built with a cached, shape-fixed padding.
    pub fn use_export_conv(&self) -> bool {
        self.export_conv && self.exportable
    }
}
