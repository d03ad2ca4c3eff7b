use crate::error::{Error, Result};
use crate::gpu::GpuContext;
use fontdue::{Font, FontSettings};
use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

/// Opaque identifier for a loaded font.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct FontId(pub(crate) usize);

/// Information about a single glyph in the font atlas.
#[derive(Clone, Copy, Debug)]
pub struct GlyphInfo {
    /// UV coordinates in the atlas (x, y, width, height) normalized to [0, 1].
    pub uv: [f32; 4],
    /// Size of the glyph in pixels.
    pub width: u32,
    pub height: u32,
    /// Offset from the cursor position to where the glyph should be drawn.
    pub offset_x: f32,
    pub offset_y: f32,
    /// How far to advance the cursor after this glyph.
    pub advance: f32,
}

const ATLAS_PADDING: u32 = 1;
const INITIAL_ATLAS_SIZE: u32 = 512;

/// Where each glyph lands in a row-packed atlas.
#[derive(Debug, PartialEq)]
struct AtlasLayout {
    width: u32,
    height: u32,
    positions: Vec<(u32, u32)>,
}

/// Row-pack `sizes` left to right, top to bottom. Starts at 512² and doubles
/// the smaller side until everything fits.
fn pack_glyphs(sizes: &[(u32, u32)]) -> AtlasLayout {
    let (mut width, mut height) = (INITIAL_ATLAS_SIZE, INITIAL_ATLAS_SIZE);
    loop {
        if let Some(positions) = try_pack(sizes, width, height) {
            return AtlasLayout {
                width,
                height,
                positions,
            };
        }
        if width <= height {
            width *= 2;
        } else {
            height *= 2;
        }
    }
}

fn try_pack(sizes: &[(u32, u32)], width: u32, height: u32) -> Option<Vec<(u32, u32)>> {
    let mut positions = Vec::with_capacity(sizes.len());
    let (mut x, mut y) = (ATLAS_PADDING, ATLAS_PADDING);
    let mut row_height = 0;

    for &(w, h) in sizes {
        if w + 2 * ATLAS_PADDING > width {
            return None;
        }
        if x + w + ATLAS_PADDING > width {
            x = ATLAS_PADDING;
            y += row_height + ATLAS_PADDING;
            row_height = 0;
        }
        if y + h + ATLAS_PADDING > height {
            return None;
        }
        positions.push((x, y));
        x += w + ATLAS_PADDING;
        row_height = row_height.max(h);
    }
    Some(positions)
}

fn parse_font(data: &[u8]) -> Result<Font> {
    Font::from_bytes(data, FontSettings::default()).map_err(|e| Error::Font(e.to_string()))
}

/// Printable ASCII rasterized into a single-channel GPU atlas.
pub struct FontAtlas {
    pub(crate) view: wgpu::TextureView,
    pub(crate) sampler: wgpu::Sampler,
    glyphs: HashMap<char, GlyphInfo>,
    size: f32,
    line_height: f32,
}

impl FontAtlas {
    pub fn new(gpu: &GpuContext, font_data: &[u8], size: f32) -> Result<Self> {
        let font = parse_font(font_data)?;

        let rasterized: Vec<(char, fontdue::Metrics, Vec<u8>)> = (32u8..=126u8)
            .map(char::from)
            .map(|c| {
                let (metrics, bitmap) = font.rasterize(c, size);
                (c, metrics, bitmap)
            })
            .collect();

        let sizes: Vec<(u32, u32)> = rasterized
            .iter()
            .map(|(_, m, _)| (m.width as u32, m.height as u32))
            .collect();
        let layout = pack_glyphs(&sizes);
        let (atlas_width, atlas_height) = (layout.width, layout.height);

        let mut atlas_data = vec![0u8; (atlas_width * atlas_height) as usize];
        let mut glyphs = HashMap::with_capacity(rasterized.len());

        for ((c, metrics, bitmap), &(x, y)) in rasterized.iter().zip(&layout.positions) {
            let (glyph_w, glyph_h) = (metrics.width as u32, metrics.height as u32);
            for gy in 0..glyph_h {
                let src = (gy * glyph_w) as usize;
                let dst = ((y + gy) * atlas_width + x) as usize;
                atlas_data[dst..dst + glyph_w as usize]
                    .copy_from_slice(&bitmap[src..src + glyph_w as usize]);
            }

            glyphs.insert(
                *c,
                GlyphInfo {
                    uv: [
                        x as f32 / atlas_width as f32,
                        y as f32 / atlas_height as f32,
                        glyph_w as f32 / atlas_width as f32,
                        glyph_h as f32 / atlas_height as f32,
                    ],
                    width: glyph_w,
                    height: glyph_h,
                    offset_x: metrics.xmin as f32,
                    offset_y: metrics.ymin as f32,
                    advance: metrics.advance_width,
                },
            );
        }

        let extent = wgpu::Extent3d {
            width: atlas_width,
            height: atlas_height,
            depth_or_array_layers: 1,
        };
        let texture = gpu.device.create_texture(&wgpu::TextureDescriptor {
            label: Some("Font Atlas"),
            size: extent,
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: wgpu::TextureFormat::R8Unorm,
            usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
            view_formats: &[],
        });

        gpu.queue.write_texture(
            wgpu::TexelCopyTextureInfo {
                texture: &texture,
                mip_level: 0,
                origin: wgpu::Origin3d::ZERO,
                aspect: wgpu::TextureAspect::All,
            },
            &atlas_data,
            wgpu::TexelCopyBufferLayout {
                offset: 0,
                bytes_per_row: Some(atlas_width),
                rows_per_image: Some(atlas_height),
            },
            extent,
        );

        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
        let sampler = gpu.device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some("Font Sampler"),
            address_mode_u: wgpu::AddressMode::ClampToEdge,
            address_mode_v: wgpu::AddressMode::ClampToEdge,
            address_mode_w: wgpu::AddressMode::ClampToEdge,
            mag_filter: wgpu::FilterMode::Linear,
            min_filter: wgpu::FilterMode::Linear,
            ..Default::default()
        });

        let line_height = font
            .horizontal_line_metrics(size)
            .map_or(size * 1.2, |m| m.new_line_size);

        Ok(Self {
            view,
            sampler,
            glyphs,
            size,
            line_height,
        })
    }

    pub fn glyph(&self, c: char) -> Option<&GlyphInfo> {
        self.glyphs.get(&c)
    }

    /// Pixel size the atlas was rasterized at.
    pub fn size(&self) -> f32 {
        self.size
    }

    pub fn line_height(&self) -> f32 {
        self.line_height
    }

    /// Width of `text` in pixels. Characters outside the atlas count as zero.
    pub fn measure(&self, text: &str) -> f32 {
        text.chars()
            .filter_map(|c| self.glyphs.get(&c))
            .map(|g| g.advance)
            .sum()
    }
}

/// Fonts loaded for the UI pass.
#[derive(Default)]
pub struct Assets {
    pub(crate) fonts: Vec<Arc<FontAtlas>>,
}

impl Assets {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load a TTF/OTF font from disk.
    pub fn load_font(
        &mut self,
        gpu: &GpuContext,
        path: impl AsRef<Path>,
        size: f32,
    ) -> Result<FontId> {
        let data = std::fs::read(path.as_ref())?;
        self.load_font_bytes(gpu, &data, size)
    }

    pub fn load_font_bytes(&mut self, gpu: &GpuContext, data: &[u8], size: f32) -> Result<FontId> {
        let atlas = FontAtlas::new(gpu, data, size)?;
        let id = FontId(self.fonts.len());
        self.fonts.push(Arc::new(atlas));
        Ok(id)
    }

    pub fn font(&self, id: FontId) -> Option<Arc<FontAtlas>> {
        self.fonts.get(id.0).cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn small_glyphs_fit_the_initial_atlas() {
        let layout = pack_glyphs(&[(10, 12); 95]);
        assert_eq!((layout.width, layout.height), (512, 512));
        assert_eq!(layout.positions.len(), 95);
        assert_eq!(layout.positions[0], (1, 1));
        assert_eq!(layout.positions[1], (12, 1));
    }

    #[test]
    fn rows_wrap_at_the_atlas_edge() {
        let layout = pack_glyphs(&[(300, 20), (300, 10)]);
        assert_eq!(layout.positions, vec![(1, 1), (1, 22)]);
    }

    #[test]
    fn atlas_grows_until_everything_fits() {
        let layout = pack_glyphs(&[(100, 100); 40]);
        assert!(layout.width * layout.height > 512 * 512);
        for (&(x, y), _) in layout.positions.iter().zip(0..) {
            assert!(x + 100 <= layout.width && y + 100 <= layout.height);
        }
    }

    #[test]
    fn oversized_glyph_widens_the_atlas() {
        let layout = pack_glyphs(&[(600, 8)]);
        assert!(layout.width >= 602);
    }

    #[test]
    fn garbage_is_not_a_font() {
        assert!(matches!(parse_font(&[0, 1, 2, 3]), Err(Error::Font(_))));
    }
}
