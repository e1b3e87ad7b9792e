//! Colormap lookup tables
//!
//! Named maps are stored as sparse anchor stops and resampled into a 256-entry
//! LUT uploaded as a 256×1 RGBA texture. User stop lists go through the same
//! resampler so both paths share the shader side.

use chartgpu_shared::ColormapSpec;

pub const LUT_SIZE: usize = 256;

// Anchor rows sampled from the matplotlib tables at 16 evenly spaced points.
const VIRIDIS: [[f32; 3]; 16] = [
    [0.267, 0.005, 0.329],
    [0.283, 0.101, 0.421],
    [0.277, 0.185, 0.490],
    [0.254, 0.265, 0.530],
    [0.222, 0.339, 0.549],
    [0.191, 0.407, 0.556],
    [0.164, 0.471, 0.558],
    [0.140, 0.534, 0.555],
    [0.121, 0.596, 0.544],
    [0.135, 0.659, 0.518],
    [0.208, 0.719, 0.473],
    [0.328, 0.774, 0.407],
    [0.478, 0.821, 0.318],
    [0.647, 0.858, 0.210],
    [0.825, 0.885, 0.106],
    [0.993, 0.906, 0.144],
];

const PLASMA: [[f32; 3]; 16] = [
    [0.050, 0.030, 0.528],
    [0.200, 0.017, 0.590],
    [0.312, 0.008, 0.636],
    [0.417, 0.001, 0.658],
    [0.517, 0.022, 0.654],
    [0.610, 0.090, 0.620],
    [0.692, 0.165, 0.564],
    [0.764, 0.240, 0.503],
    [0.826, 0.315, 0.442],
    [0.881, 0.393, 0.383],
    [0.925, 0.474, 0.326],
    [0.959, 0.558, 0.268],
    [0.981, 0.649, 0.212],
    [0.989, 0.745, 0.167],
    [0.977, 0.847, 0.145],
    [0.940, 0.975, 0.131],
];

const INFERNO: [[f32; 3]; 16] = [
    [0.001, 0.000, 0.014],
    [0.042, 0.029, 0.141],
    [0.123, 0.047, 0.283],
    [0.217, 0.037, 0.370],
    [0.310, 0.055, 0.401],
    [0.400, 0.085, 0.405],
    [0.490, 0.115, 0.392],
    [0.581, 0.146, 0.364],
    [0.671, 0.180, 0.321],
    [0.754, 0.224, 0.265],
    [0.827, 0.280, 0.199],
    [0.887, 0.349, 0.128],
    [0.932, 0.429, 0.058],
    [0.961, 0.519, 0.028],
    [0.973, 0.617, 0.100],
    [0.988, 0.998, 0.645],
];

fn anchors(spec: &ColormapSpec) -> Vec<[f32; 4]> {
    match spec {
        ColormapSpec::Viridis => VIRIDIS.iter().map(|c| [c[0], c[1], c[2], 1.0]).collect(),
        ColormapSpec::Plasma => PLASMA.iter().map(|c| [c[0], c[1], c[2], 1.0]).collect(),
        ColormapSpec::Inferno => INFERNO.iter().map(|c| [c[0], c[1], c[2], 1.0]).collect(),
        ColormapSpec::Stops(stops) => {
            if stops.is_empty() {
                vec![[0.0, 0.0, 0.0, 1.0], [1.0, 1.0, 1.0, 1.0]]
            } else if stops.len() == 1 {
                vec![stops[0], stops[0]]
            } else {
                stops.clone()
            }
        }
    }
}

/// Samples a colormap at `t ∈ [0, 1]` with linear interpolation between
/// anchors.
pub fn sample_colormap(spec: &ColormapSpec, t: f32) -> [f32; 4] {
    let anchors = anchors(spec);
    let t = t.clamp(0.0, 1.0);
    let position = t * (anchors.len() - 1) as f32;
    let index = (position.floor() as usize).min(anchors.len() - 2);
    let frac = position - index as f32;
    let a = anchors[index];
    let b = anchors[index + 1];
    [
        a[0] + (b[0] - a[0]) * frac,
        a[1] + (b[1] - a[1]) * frac,
        a[2] + (b[2] - a[2]) * frac,
        a[3] + (b[3] - a[3]) * frac,
    ]
}

/// Full 256-entry LUT for upload.
pub fn colormap_lut(spec: &ColormapSpec) -> Vec<[f32; 4]> {
    (0..LUT_SIZE)
        .map(|i| sample_colormap(spec, i as f32 / (LUT_SIZE - 1) as f32))
        .collect()
}

/// A 256×1 LUT texture with its view and sampler.
pub struct ColormapTexture {
    pub texture: wgpu::Texture,
    pub view: wgpu::TextureView,
    pub sampler: wgpu::Sampler,
}

impl ColormapTexture {
    pub fn new(device: &wgpu::Device, queue: &wgpu::Queue, spec: &ColormapSpec) -> Self {
        let lut = colormap_lut(spec);
        let pixels: Vec<u8> = lut
            .iter()
            .flat_map(|c| c.iter().map(|v| (v.clamp(0.0, 1.0) * 255.0).round() as u8))
            .collect();

        let texture = device.create_texture(&wgpu::TextureDescriptor {
            label: Some("colormap-lut"),
            size: wgpu::Extent3d {
                width: LUT_SIZE as u32,
                height: 1,
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: wgpu::TextureFormat::Rgba8Unorm,
            usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
            view_formats: &[],
        });

        queue.write_texture(
            wgpu::TexelCopyTextureInfo {
                texture: &texture,
                mip_level: 0,
                origin: wgpu::Origin3d::ZERO,
                aspect: wgpu::TextureAspect::All,
            },
            &pixels,
            wgpu::TexelCopyBufferLayout {
                offset: 0,
                bytes_per_row: Some(LUT_SIZE as u32 * 4),
                rows_per_image: Some(1),
            },
            wgpu::Extent3d {
                width: LUT_SIZE as u32,
                height: 1,
                depth_or_array_layers: 1,
            },
        );

        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
        let sampler = device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some("colormap-sampler"),
            address_mode_u: wgpu::AddressMode::ClampToEdge,
            address_mode_v: wgpu::AddressMode::ClampToEdge,
            mag_filter: wgpu::FilterMode::Linear,
            min_filter: wgpu::FilterMode::Linear,
            ..Default::default()
        });

        Self {
            texture,
            view,
            sampler,
        }
    }

    pub fn destroy(&self) {
        self.texture.destroy();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lut_has_full_resolution() {
        assert_eq!(colormap_lut(&ColormapSpec::Viridis).len(), LUT_SIZE);
    }

    #[test]
    fn test_endpoints_match_anchors() {
        let lut = colormap_lut(&ColormapSpec::Viridis);
        assert_eq!(lut[0], [0.267, 0.005, 0.329, 1.0]);
        assert_eq!(lut[LUT_SIZE - 1], [0.993, 0.906, 0.144, 1.0]);
    }

    #[test]
    fn test_sample_order_follows_gradient() {
        // Monotonically increasing inputs walk the LUT in order: for viridis
        // the green channel rises along the gradient.
        let samples: Vec<[f32; 4]> = (0..10)
            .map(|i| sample_colormap(&ColormapSpec::Viridis, i as f32 / 9.0))
            .collect();
        assert!(samples.windows(2).all(|w| w[1][1] >= w[0][1]));
    }

    #[test]
    fn test_user_stops_resampled() {
        let spec = ColormapSpec::Stops(vec![[0.0, 0.0, 0.0, 1.0], [1.0, 0.0, 0.0, 1.0]]);
        let mid = sample_colormap(&spec, 0.5);
        assert!((mid[0] - 0.5).abs() < 1e-6);
        assert_eq!(mid[3], 1.0);
    }
}
