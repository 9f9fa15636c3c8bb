//! 2D and cube textures.

use std::collections::HashMap;
use std::sync::Arc;

use image::{DynamicImage, GenericImageView};

use crate::context::Context;
use crate::error::{RendererError, Result};
use crate::scene::TextureKind;

/// Wrapping parameters for a texture.
#[derive(Copy, Clone, Debug, Default, Hash, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum TextureWrapping {
    /// Repeats the texture when a texture coordinate is out of bounds.
    #[default]
    Repeat,
    /// Repeats the mirrored texture when a texture coordinate is out of bounds.
    MirroredRepeat,
    /// Repeats the nearest edge point texture color when a texture coordinate is out of bounds.
    ClampToEdge,
}

impl From<TextureWrapping> for wgpu::AddressMode {
    #[inline]
    fn from(val: TextureWrapping) -> Self {
        match val {
            TextureWrapping::Repeat => wgpu::AddressMode::Repeat,
            TextureWrapping::MirroredRepeat => wgpu::AddressMode::MirrorRepeat,
            TextureWrapping::ClampToEdge => wgpu::AddressMode::ClampToEdge,
        }
    }
}

/// Creation options of a [`Texture`].
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct TextureOptions {
    /// Generate a box-filtered mip chain.
    pub mipmaps: bool,
    /// Store the texels as sRGB.
    pub srgb: bool,
}

impl TextureOptions {
    /// Options with mipmaps enabled.
    pub fn mipmapped() -> Self {
        TextureOptions {
            mipmaps: true,
            srgb: false,
        }
    }
}

/// A GPU texture with its view.
pub struct Texture {
    /// The underlying wgpu texture.
    pub texture: wgpu::Texture,
    /// The texture view for binding.
    pub view: wgpu::TextureView,
    /// Texture dimensions (width, height).
    pub size: (u32, u32),
    mip_level_count: u32,
}

impl Texture {
    /// Uploads `data`, `bpp` bytes per pixel (3 for RGB, 4 for RGBA), row by row.
    pub fn new(
        ctxt: &Context,
        data: &[u8],
        width: u32,
        height: u32,
        bpp: u32,
        options: TextureOptions,
    ) -> Result<Arc<Texture>> {
        let rgba = to_rgba(data, width, height, bpp)?;

        let mip_level_count = if options.mipmaps {
            mip_level_count(width, height)
        } else {
            1
        };

        let format = if options.srgb {
            wgpu::TextureFormat::Rgba8UnormSrgb
        } else {
            wgpu::TextureFormat::Rgba8Unorm
        };

        let texture = ctxt.create_texture(&wgpu::TextureDescriptor {
            label: Some("texture"),
            size: wgpu::Extent3d {
                width,
                height,
                depth_or_array_layers: 1,
            },
            mip_level_count,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format,
            usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
            view_formats: &[],
        });

        upload_mip_chain(ctxt, &texture, 0, rgba, width, height, mip_level_count);

        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());

        Ok(Arc::new(Texture {
            texture,
            view,
            size: (width, height),
            mip_level_count,
        }))
    }

    /// Creates a texture from a decoded image.
    pub fn from_image(
        ctxt: &Context,
        image: &DynamicImage,
        options: TextureOptions,
    ) -> Result<Arc<Texture>> {
        let (width, height) = image.dimensions();
        let rgba = image.to_rgba8();
        Self::new(ctxt, rgba.as_raw(), width, height, 4, options)
    }

    /// Creates a 1x1 texture of the given color.
    pub fn solid(ctxt: &Context, color: [u8; 4]) -> Result<Arc<Texture>> {
        Self::new(ctxt, &color, 1, 1, 4, TextureOptions::default())
    }

    /// Number of mip levels.
    #[inline]
    pub fn mip_level_count(&self) -> u32 {
        self.mip_level_count
    }
}

/// One face of a [`CubeTexture`].
#[derive(Copy, Clone, Debug)]
pub struct CubeFace<'a> {
    /// Pixel data.
    pub data: &'a [u8],
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
    /// Bytes per pixel (3 or 4).
    pub bpp: u32,
}

/// A cube map, sampled with clamp-to-edge wrapping.
pub struct CubeTexture {
    /// The underlying 6-layer wgpu texture.
    pub texture: wgpu::Texture,
    /// The cube view for binding.
    pub view: wgpu::TextureView,
    /// The cube sampler.
    pub sampler: wgpu::Sampler,
    /// Face dimensions (width, height).
    pub size: (u32, u32),
}

/// Checks there are six faces of the same size, and returns that size.
fn check_cube_faces(faces: &[CubeFace]) -> Result<(u32, u32)> {
    if faces.len() < 6 {
        return Err(RendererError::IncompleteCubeTexture(faces.len()));
    }

    let expected = (faces[0].width, faces[0].height);
    match faces[..6]
        .iter()
        .position(|face| (face.width, face.height) != expected)
    {
        Some(face) => Err(RendererError::MismatchedCubeFace {
            face,
            size: (faces[face].width, faces[face].height),
            expected,
        }),
        None => Ok(expected),
    }
}

impl CubeTexture {
    /// Creates a cube map from its faces, in the order +X, -X, +Y, -Y, +Z, -Z.
    pub fn new(ctxt: &Context, faces: &[CubeFace], mipmaps: bool) -> Result<Arc<CubeTexture>> {
        let (width, height) = check_cube_faces(faces)?;
        let mip_level_count = if mipmaps {
            mip_level_count(width, height)
        } else {
            1
        };

        let texture = ctxt.create_texture(&wgpu::TextureDescriptor {
            label: Some("cube_texture"),
            size: wgpu::Extent3d {
                width,
                height,
                depth_or_array_layers: 6,
            },
            mip_level_count,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: wgpu::TextureFormat::Rgba8Unorm,
            usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
            view_formats: &[],
        });

        for (layer, face) in faces.iter().take(6).enumerate() {
            let rgba = to_rgba(face.data, width, height, face.bpp)?;
            upload_mip_chain(ctxt, &texture, layer as u32, rgba, width, height, mip_level_count);
        }

        let view = texture.create_view(&wgpu::TextureViewDescriptor {
            label: Some("cube_texture_view"),
            dimension: Some(wgpu::TextureViewDimension::Cube),
            ..Default::default()
        });

        let sampler = ctxt.create_sampler(&wgpu::SamplerDescriptor {
            label: Some("cube_texture_sampler"),
            address_mode_u: wgpu::AddressMode::ClampToEdge,
            address_mode_v: wgpu::AddressMode::ClampToEdge,
            address_mode_w: wgpu::AddressMode::ClampToEdge,
            mag_filter: wgpu::FilterMode::Linear,
            min_filter: wgpu::FilterMode::Linear,
            mipmap_filter: wgpu::FilterMode::Linear,
            ..Default::default()
        });

        Ok(Arc::new(CubeTexture {
            texture,
            view,
            sampler,
            size: (width, height),
        }))
    }
}

/// Textures bound when a mesh part slot is empty.
#[derive(Clone)]
pub struct DefaultTextures {
    /// White: the material diffuse color is used as is.
    pub diffuse: Arc<Texture>,
    /// White: the material specular color is used as is.
    pub specular: Arc<Texture>,
    /// Flat normal (128, 128, 255).
    pub bump: Arc<Texture>,
    /// Black: no displacement.
    pub displacement: Arc<Texture>,
}

impl DefaultTextures {
    /// Creates the four 1x1 fallback textures.
    pub fn new(ctxt: &Context) -> Result<DefaultTextures> {
        Ok(DefaultTextures {
            diffuse: Texture::solid(ctxt, TextureKind::Diffuse.default_texel())?,
            specular: Texture::solid(ctxt, TextureKind::Specular.default_texel())?,
            bump: Texture::solid(ctxt, TextureKind::Bump.default_texel())?,
            displacement: Texture::solid(ctxt, TextureKind::Displacement.default_texel())?,
        })
    }
}

/// Linear samplers shared between every texture slot with the same wrapping.
#[derive(Default)]
pub struct SamplerCache {
    samplers: HashMap<(TextureWrapping, TextureWrapping), wgpu::Sampler>,
}

impl SamplerCache {
    /// Creates an empty cache.
    pub fn new() -> Self {
        Self::default()
    }

    /// The sampler wrapping horizontally with `wrap_s` and vertically with `wrap_t`.
    pub fn get(
        &mut self,
        ctxt: &Context,
        wrap_s: TextureWrapping,
        wrap_t: TextureWrapping,
    ) -> &wgpu::Sampler {
        self.samplers.entry((wrap_s, wrap_t)).or_insert_with(|| {
            log::debug!("creating sampler {:?}/{:?}", wrap_s, wrap_t);
            ctxt.create_sampler(&wgpu::SamplerDescriptor {
                label: Some("texture_sampler"),
                address_mode_u: wrap_s.into(),
                address_mode_v: wrap_t.into(),
                address_mode_w: wgpu::AddressMode::Repeat,
                mag_filter: wgpu::FilterMode::Linear,
                min_filter: wgpu::FilterMode::Linear,
                mipmap_filter: wgpu::FilterMode::Linear,
                ..Default::default()
            })
        })
    }

    /// Number of distinct samplers created so far.
    pub fn len(&self) -> usize {
        self.samplers.len()
    }

    /// Whether no sampler was created yet.
    pub fn is_empty(&self) -> bool {
        self.samplers.is_empty()
    }
}

/// Number of levels of a full mip chain.
pub fn mip_level_count(width: u32, height: u32) -> u32 {
    32 - width.max(height).max(1).leading_zeros()
}

/// Validates `data` and expands RGB pixels to RGBA.
pub fn to_rgba(data: &[u8], width: u32, height: u32, bpp: u32) -> Result<Vec<u8>> {
    if bpp != 3 && bpp != 4 {
        return Err(RendererError::UnsupportedPixelFormat(bpp));
    }

    let expected = width as usize * height as usize * bpp as usize;
    if data.len() != expected || expected == 0 {
        return Err(RendererError::InvalidTextureData {
            expected,
            actual: data.len(),
        });
    }

    if bpp == 4 {
        return Ok(data.to_vec());
    }

    let mut rgba = Vec::with_capacity(width as usize * height as usize * 4);
    for rgb in data.chunks_exact(3) {
        rgba.extend_from_slice(rgb);
        rgba.push(255);
    }
    Ok(rgba)
}

fn upload_mip_chain(
    ctxt: &Context,
    texture: &wgpu::Texture,
    layer: u32,
    mut data: Vec<u8>,
    mut width: u32,
    mut height: u32,
    mip_level_count: u32,
) {
    for mip_level in 0..mip_level_count {
        if mip_level > 0 {
            data = downsample_rgba(&data, width, height);
            width = (width / 2).max(1);
            height = (height / 2).max(1);
        }

        ctxt.write_texture(
            wgpu::TexelCopyTextureInfo {
                texture,
                mip_level,
                origin: wgpu::Origin3d {
                    x: 0,
                    y: 0,
                    z: layer,
                },
                aspect: wgpu::TextureAspect::All,
            },
            &data,
            wgpu::TexelCopyBufferLayout {
                offset: 0,
                bytes_per_row: Some(width * 4),
                rows_per_image: Some(height),
            },
            wgpu::Extent3d {
                width,
                height,
                depth_or_array_layers: 1,
            },
        );
    }
}

/// Downsamples an RGBA image by half using box filtering.
pub fn downsample_rgba(data: &[u8], width: u32, height: u32) -> Vec<u8> {
    let new_width = (width / 2).max(1);
    let new_height = (height / 2).max(1);
    let mut new_data = vec![0u8; (new_width * new_height * 4) as usize];

    for y in 0..new_height {
        for x in 0..new_width {
            let mut sum = [0u32; 4];
            let mut count = 0u32;

            // 2x2 block, or fewer pixels on odd edges.
            for dy in 0..2 {
                for dx in 0..2 {
                    let sx = (x * 2 + dx) as usize;
                    let sy = (y * 2 + dy) as usize;
                    if sx < width as usize && sy < height as usize {
                        let idx = (sy * width as usize + sx) * 4;
                        for c in 0..4 {
                            sum[c] += data[idx + c] as u32;
                        }
                        count += 1;
                    }
                }
            }

            let dst = ((y * new_width + x) * 4) as usize;
            for c in 0..4 {
                new_data[dst + c] = (sum[c] / count) as u8;
            }
        }
    }

    new_data
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rgb_is_expanded_with_opaque_alpha() {
        let rgba = to_rgba(&[1, 2, 3, 4, 5, 6], 2, 1, 3).unwrap();
        assert_eq!(rgba, vec![1, 2, 3, 255, 4, 5, 6, 255]);
    }

    #[test]
    fn wrong_sizes_and_formats_are_rejected() {
        assert!(matches!(
            to_rgba(&[0; 8], 2, 2, 4),
            Err(RendererError::InvalidTextureData {
                expected: 16,
                actual: 8
            })
        ));
        assert!(matches!(
            to_rgba(&[0; 8], 2, 2, 2),
            Err(RendererError::UnsupportedPixelFormat(2))
        ));
    }

    #[test]
    fn cube_faces_must_share_a_size() {
        static SMALL: [u8; 4 * 3] = [0; 4 * 3];
        static LARGE: [u8; 16 * 3] = [0; 16 * 3];
        let face = |data: &'static [u8], side: u32| CubeFace {
            data,
            width: side,
            height: side,
            bpp: 3,
        };

        let mut faces = [face(&SMALL, 2); 6];
        assert_eq!(check_cube_faces(&faces).unwrap(), (2, 2));
        assert!(matches!(
            check_cube_faces(&faces[..5]),
            Err(RendererError::IncompleteCubeTexture(5))
        ));

        faces[3] = face(&LARGE, 4);
        assert!(matches!(
            check_cube_faces(&faces),
            Err(RendererError::MismatchedCubeFace {
                face: 3,
                size: (4, 4),
                expected: (2, 2),
            })
        ));
    }

    #[test]
    fn mip_chain_goes_down_to_one_pixel() {
        assert_eq!(mip_level_count(1, 1), 1);
        assert_eq!(mip_level_count(256, 256), 9);
        assert_eq!(mip_level_count(300, 20), 9);
    }

    #[test]
    fn downsampling_averages_blocks() {
        #[rustfmt::skip]
        let data = [
            0, 0, 0, 255,   255, 255, 255, 255,   10, 10, 10, 10,
            255, 255, 255, 255,   0, 0, 0, 255,   20, 20, 20, 20,
        ];
        let half = downsample_rgba(&data, 3, 2);
        assert_eq!(half, vec![127, 127, 127, 255]);
    }
}
