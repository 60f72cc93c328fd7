//! Writing rendered images to PNG files.

use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::Path;

use png::{Encoder, chunk::ChunkType};

use volray_render::RenderedImage;

/// Writes `image` to a new file at `path` as 8-bit sRGB RGBA with alpha.
pub fn write_png(path: &Path, image: &RenderedImage) -> Result<(), io::Error> {
    let mut buf_writer = BufWriter::new(File::create(path)?);
    write_png_to(&mut buf_writer, image)?;
    let file = buf_writer.into_inner().map_err(io::IntoInnerError::into_error)?;
    file.sync_all()?;
    Ok(())
}

/// Encodes `image` as PNG to any writer.
pub fn write_png_to<W: Write>(writer: W, image: &RenderedImage) -> Result<(), io::Error> {
    let mut png_encoder = Encoder::new(writer, image.size.width, image.size.height);
    png_encoder.set_color(png::ColorType::Rgba);
    png_encoder.set_depth(png::BitDepth::Eight);
    png_encoder.set_compression(png::Compression::Best);
    let mut png_writer = png_encoder.write_header()?;
    write_color_metadata(&mut png_writer)?;
    png_writer.write_image_data(image.to_srgb8().as_flattened())?;
    png_writer.finish()?;
    Ok(())
}

fn write_color_metadata<W: Write>(png_writer: &mut png::Writer<W>) -> Result<(), io::Error> {
    // Declare that the image is sRGB, with rendering intent "perceptual".
    png_writer.write_chunk(ChunkType(*b"sRGB"), &[0])?;
    // Gamma and chromaticities for decoders that don't understand sRGB.
    png_writer.write_chunk(ChunkType(*b"gAMA"), &45455_u32.to_be_bytes())?;
    png_writer.write_chunk(
        ChunkType(*b"cHRM"),
        &[
            31270, // White Point x
            32900, // White Point y
            64000, // Red x
            33000, // Red y
            30000, // Green x
            60000, // Green y
            15000, // Blue x
            6000,  // Blue y
        ]
        .into_iter()
        .flat_map(u32::to_be_bytes)
        .collect::<Box<[u8]>>(),
    )?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use euclid::{size2, size3, vec3};
    use pretty_assertions::assert_eq;
    use std::sync::Arc;
    use volray::VolumeTransform;
    use volray::math::{Rgba, Vol, WorldSize};
    use volray::resource::DensityTexture;
    use volray_render::transfer::TransferFunction1D;
    use volray_render::{
        Camera, Projection, RenderOptions, TransferFunction, VolumeLayer, VolumeRenderer,
        VolumeScene,
    };

    /// Three pixels across a unit cube: only the middle one hits it.
    fn render_strip() -> RenderedImage {
        let layer = VolumeLayer::new(
            Arc::new(DensityTexture::Single(Vol::repeat(size3(2, 2, 2), 1.0))),
            None,
            TransferFunction::OneD(TransferFunction1D::constant(Rgba::WHITE)),
        )
        .unwrap();
        let transform = VolumeTransform::new(WorldSize::new(1.0, 1.0, 1.0));
        let camera = Camera::framing(
            &transform,
            vec3(0.0, 0.0, 1.0),
            Projection::Orthographic { half_height: 1.0 },
            size2(3, 1),
        );
        VolumeRenderer::new(camera)
            .render(&VolumeScene::new(transform, layer), &RenderOptions::exact())
    }

    #[test]
    fn written_file_decodes() {
        let image = render_strip();
        let expected = image.to_srgb8();
        assert_eq!(expected[0], [0, 0, 0, 0]);
        assert_eq!(expected[1][3], 255);

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.png");
        write_png(&path, &image).unwrap();

        let decoder = png::Decoder::new(File::open(&path).unwrap());
        let mut reader = decoder.read_info().unwrap();
        let mut buf = vec![0; reader.output_buffer_size()];
        let frame = reader.next_frame(&mut buf).unwrap();
        assert_eq!((frame.width, frame.height), (3, 1));
        assert_eq!(frame.color_type, png::ColorType::Rgba);
        assert_eq!(&buf[..frame.buffer_size()], expected.as_flattened());
    }
}
