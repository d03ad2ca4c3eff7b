use crate::gpu::GpuContext;

/// How 8-bit texel values should be interpreted when sampled.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ColorSpace {
    /// Color data; decoded to linear on sample.
    Srgb,
    /// Non-color data such as normal maps.
    Linear,
}

impl ColorSpace {
    fn rgba8_format(self) -> wgpu::TextureFormat {
        match self {
            ColorSpace::Srgb => wgpu::TextureFormat::Rgba8UnormSrgb,
            ColorSpace::Linear => wgpu::TextureFormat::Rgba8Unorm,
        }
    }
}

/// Decoded RGBA8 pixels, produced off the render thread.
#[derive(Clone, Debug)]
pub struct ImageData {
    pub width: u32,
    pub height: u32,
    pub rgba: Vec<u8>,
}

impl ImageData {
    pub fn decode(path: &std::path::Path) -> Result<Self, image::ImageError> {
        let img = image::open(path)?.to_rgba8();
        let (width, height) = img.dimensions();
        Ok(Self {
            width,
            height,
            rgba: img.into_raw(),
        })
    }
}

/// One mip level of texel data.
pub struct MipLevel<'a> {
    pub width: u32,
    pub height: u32,
    pub bytes: &'a [u8],
}

/// A GPU texture with its default view and sampler.
#[derive(Debug)]
pub struct Texture {
    pub(crate) texture: wgpu::Texture,
    pub(crate) view: wgpu::TextureView,
    pub(crate) sampler: wgpu::Sampler,
    pub width: u32,
    pub height: u32,
}

impl Texture {
    /// Create a single-level texture from raw RGBA8 data.
    pub fn from_rgba(
        gpu: &GpuContext,
        data: &[u8],
        width: u32,
        height: u32,
        space: ColorSpace,
        label: &str,
    ) -> Self {
        Self::from_levels(
            gpu,
            &[MipLevel {
                width,
                height,
                bytes: data,
            }],
            space.rgba8_format(),
            4,
            wgpu::AddressMode::Repeat,
            label,
        )
    }

    pub fn from_image(gpu: &GpuContext, image: &ImageData, space: ColorSpace, label: &str) -> Self {
        Self::from_rgba(gpu, &image.rgba, image.width, image.height, space, label)
    }

    /// Create a texture from a full mip chain.
    ///
    /// `bytes_per_texel` must match `format`. U wraps with `address_u`, V is
    /// always clamped.
    pub fn from_levels(
        gpu: &GpuContext,
        levels: &[MipLevel],
        format: wgpu::TextureFormat,
        bytes_per_texel: u32,
        address_u: wgpu::AddressMode,
        label: &str,
    ) -> Self {
        let (width, height) = levels
            .first()
            .map(|l| (l.width.max(1), l.height.max(1)))
            .unwrap_or((1, 1));

        let texture = gpu.device.create_texture(&wgpu::TextureDescriptor {
            label: Some(label),
            size: wgpu::Extent3d {
                width,
                height,
                depth_or_array_layers: 1,
            },
            mip_level_count: levels.len().max(1) as u32,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format,
            usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
            view_formats: &[],
        });

        for (mip, level) in levels.iter().enumerate() {
            gpu.queue.write_texture(
                wgpu::TexelCopyTextureInfo {
                    texture: &texture,
                    mip_level: mip as u32,
                    origin: wgpu::Origin3d::ZERO,
                    aspect: wgpu::TextureAspect::All,
                },
                level.bytes,
                wgpu::TexelCopyBufferLayout {
                    offset: 0,
                    bytes_per_row: Some(level.width * bytes_per_texel),
                    rows_per_image: Some(level.height),
                },
                wgpu::Extent3d {
                    width: level.width,
                    height: level.height,
                    depth_or_array_layers: 1,
                },
            );
        }

        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
        let sampler = gpu.device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some(&format!("{label} Sampler")),
            address_mode_u: address_u,
            address_mode_v: wgpu::AddressMode::ClampToEdge,
            address_mode_w: wgpu::AddressMode::ClampToEdge,
            mag_filter: wgpu::FilterMode::Linear,
            min_filter: wgpu::FilterMode::Linear,
            mipmap_filter: wgpu::FilterMode::Linear,
            ..Default::default()
        });

        Self {
            texture,
            view,
            sampler,
            width,
            height,
        }
    }

    /// 1×1 opaque white, bound where a material has no texture.
    pub fn white(gpu: &GpuContext) -> Self {
        Self::from_rgba(gpu, &[255; 4], 1, 1, ColorSpace::Srgb, "White Texture")
    }

    /// 1×1 tangent-space "straight up" normal.
    pub fn flat_normal(gpu: &GpuContext) -> Self {
        Self::from_rgba(
            gpu,
            &[128, 128, 255, 255],
            1,
            1,
            ColorSpace::Linear,
            "Flat Normal Texture",
        )
    }

    pub fn mip_count(&self) -> u32 {
        self.texture.mip_level_count()
    }
}
