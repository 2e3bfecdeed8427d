//! Render options supplied by the viewer controls.

/// Optional overrides for voxelization. Unset fields take the defaults
/// resolved by [`voxelize`](crate::voxelize::voxelize).
#[derive(Clone, Debug, Default, PartialEq)]
pub struct RenderOptions {
    /// Probability cutoff. Negative values clamp to 0; NaN/inf is an error.
    pub threshold: Option<f32>,
    /// Lower edge of the z window in world meters.
    pub z_filter_min: Option<f32>,
    /// Upper edge of the z window in world meters.
    pub z_filter_max: Option<f32>,
    /// Number of top z layers to hide.
    pub drop_top_layers: Option<u32>,
}

impl RenderOptions {
    pub fn with_threshold(mut self, threshold: f32) -> Self {
        self.threshold = Some(threshold);
        self
    }

    pub fn with_z_window(mut self, min: Option<f32>, max: Option<f32>) -> Self {
        self.z_filter_min = min;
        self.z_filter_max = max;
        self
    }

    pub fn with_drop_top_layers(mut self, layers: u32) -> Self {
        self.drop_top_layers = Some(layers);
        self
    }

    /// Parse a URL query string such as `"?occ_threshold=0.4&z_max=2.5"`.
    ///
    /// Recognised keys are `threshold`, `z_min`, `z_max` and `top_layers`,
    /// each also accepted with an `occ_` prefix. The prefixed form wins
    /// when both are present. Values that fail to parse are ignored.
    pub fn from_query(query: &str) -> Self {
        let query = query.strip_prefix('?').unwrap_or(query);
        let mut plain = RenderOptions::default();
        let mut prefixed = RenderOptions::default();

        for pair in query.split('&').filter(|p| !p.is_empty()) {
            let (key, value) = pair.split_once('=').unwrap_or((pair, ""));
            let (target, key) = match key.strip_prefix("occ_") {
                Some(rest) => (&mut prefixed, rest),
                None => (&mut plain, key),
            };
            let value = value.trim();
            match key {
                "threshold" => target.threshold = parse_or_ignore(key, value),
                "z_min" => target.z_filter_min = parse_or_ignore(key, value),
                "z_max" => target.z_filter_max = parse_or_ignore(key, value),
                "top_layers" => target.drop_top_layers = parse_or_ignore(key, value),
                _ => {}
            }
        }

        RenderOptions {
            threshold: prefixed.threshold.or(plain.threshold),
            z_filter_min: prefixed.z_filter_min.or(plain.z_filter_min),
            z_filter_max: prefixed.z_filter_max.or(plain.z_filter_max),
            drop_top_layers: prefixed.drop_top_layers.or(plain.drop_top_layers),
        }
    }
}

fn parse_or_ignore<T: std::str::FromStr>(key: &str, value: &str) -> Option<T> {
    match value.parse() {
        Ok(v) => Some(v),
        Err(_) => {
            tracing::debug!(key, value, "ignoring unparseable render option");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_is_all_unset() {
        let opts = RenderOptions::default();
        assert_eq!(opts.threshold, None);
        assert_eq!(opts.z_filter_min, None);
        assert_eq!(opts.z_filter_max, None);
        assert_eq!(opts.drop_top_layers, None);
    }

    #[test]
    fn parses_plain_keys() {
        let opts = RenderOptions::from_query("?threshold=0.3&z_min=-0.5&z_max=2&top_layers=2");
        assert_eq!(opts.threshold, Some(0.3));
        assert_eq!(opts.z_filter_min, Some(-0.5));
        assert_eq!(opts.z_filter_max, Some(2.0));
        assert_eq!(opts.drop_top_layers, Some(2));
    }

    #[test]
    fn prefixed_keys_win() {
        let opts = RenderOptions::from_query("threshold=0.3&occ_threshold=0.6&occ_top_layers=1");
        assert_eq!(opts.threshold, Some(0.6));
        assert_eq!(opts.drop_top_layers, Some(1));

        let opts = RenderOptions::from_query("occ_threshold=0.6&threshold=0.3");
        assert_eq!(opts.threshold, Some(0.6));
    }

    #[test]
    fn bad_values_are_ignored() {
        let opts = RenderOptions::from_query("threshold=abc&top_layers=-1&z_max=&scene=foo");
        assert_eq!(opts, RenderOptions::default());
    }

    #[test]
    fn builders_set_fields() {
        let opts = RenderOptions::default()
            .with_threshold(0.2)
            .with_z_window(Some(0.0), None)
            .with_drop_top_layers(3);
        assert_eq!(opts.threshold, Some(0.2));
        assert_eq!(opts.z_filter_min, Some(0.0));
        assert_eq!(opts.z_filter_max, None);
        assert_eq!(opts.drop_top_layers, Some(3));
    }
}
