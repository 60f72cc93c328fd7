//! From raw integer arrays to rendered pixels.

use euclid::{size2, size3, vec3};

use volray::math::{Rgb, Rgba};
use volray::resource::ResourceKind;
use volray::source::RawDensityArrays;
use volray::util::yield_progress_for_testing;
use volray::{Dataset, DatasetOptions};
use volray_render::transfer::{TransferFunction2D, TransferRegion, step_1d};
use volray_render::{
    Camera, Projection, RenderMode, RenderOptions, SceneError, TransferFunction, VolumeRenderer,
    VolumeScene,
};

/// A 16³ field of zeros with a block of 200 in the middle, and one voxel of 255 in a corner
/// so that the value range is 0 to 255.
fn block_dataset() -> Dataset {
    let source = RawDensityArrays::from_fn(size3(16, 16, 16), |x, y, z| {
        let middle = |c: u32| (4..12).contains(&c);
        if (x, y, z) == (0, 0, 0) {
            255
        } else if middle(x) && middle(y) && middle(z) {
            200
        } else {
            0
        }
    });
    Dataset::new(source, DatasetOptions::default()).unwrap()
}

fn center_pixel_renderer(dataset: &Dataset) -> VolumeRenderer {
    VolumeRenderer::new(Camera::framing(
        dataset.transform(),
        vec3(0.2, 0.3, 1.0),
        Projection::Perspective {
            fov_y: euclid::Angle::degrees(40.0),
        },
        size2(1, 1),
    ))
}

#[tokio::test]
async fn scene_requires_committed_resources() {
    let dataset = block_dataset();
    let tf = TransferFunction::OneD(step_1d(0.5, Rgba::WHITE));
    assert_eq!(
        VolumeScene::from_dataset(&dataset, tf.clone()).unwrap_err(),
        SceneError::NotReady(ResourceKind::Density)
    );
    dataset
        .density_resource(yield_progress_for_testing())
        .await
        .unwrap();
    assert!(VolumeScene::from_dataset(&dataset, tf).is_ok());

    let tf_2d = TransferFunction::TwoD(TransferFunction2D::from_regions(&[]));
    assert_eq!(
        VolumeScene::from_dataset(&dataset, tf_2d).unwrap_err(),
        SceneError::NotReady(ResourceKind::Gradient)
    );
}

#[tokio::test]
async fn dvr_saturates_and_mip_reports_peak() {
    let dataset = block_dataset();
    dataset
        .density_resource(yield_progress_for_testing())
        .await
        .unwrap();
    let red = Rgb::new(1.0, 0.0, 0.0).with_alpha_one();
    let scene =
        VolumeScene::from_dataset(&dataset, TransferFunction::OneD(step_1d(0.5, red))).unwrap();
    let renderer = center_pixel_renderer(&dataset);

    let mut options = RenderOptions::exact();
    options.mode = RenderMode::Dvr;
    let image = renderer.render(&scene, &options);
    let pixel = image.pixel(0, 0);
    assert!(pixel.alpha() > 0.99, "{pixel:?}");
    assert!((pixel.red() - 1.0).abs() < 1e-4, "{pixel:?}");
    assert_eq!((pixel.green(), pixel.blue()), (0.0, 0.0));
    assert!(image.depth_at(0, 0).is_finite());

    options.mode = RenderMode::Mip;
    let image = renderer.render(&scene, &options);
    let peak = image.pixel(0, 0).alpha();
    assert!((peak - 200.0 / 255.0).abs() < 1e-5, "{peak}");
}

#[tokio::test]
async fn gradient_transfer_function_sees_block_edges() {
    let dataset = block_dataset();
    dataset
        .density_resource(yield_progress_for_testing())
        .await
        .unwrap();
    dataset
        .gradient_resource(yield_progress_for_testing())
        .await
        .unwrap();
    // Opaque only where the gradient is strong, i.e. at the faces of the block.
    let tf = TransferFunction::TwoD(TransferFunction2D::from_regions(&[TransferRegion {
        density: [0.05, 1.0],
        gradient: [0.05, 1.0],
        color: Rgba::WHITE,
    }]));
    let scene = VolumeScene::from_dataset(&dataset, tf).unwrap();
    let renderer = center_pixel_renderer(&dataset);
    let mut options = RenderOptions::exact();
    options.mode = RenderMode::Surface;
    options.surface_gradient_threshold = 0.05;

    let image = renderer.render(&scene, &options);
    assert_eq!(image.pixel(0, 0).alpha(), 1.0);
    let to_surface = image.depth_at(0, 0);

    // The block's faces are 4 units from the center of the 16-unit cube.
    let to_center = (renderer.camera().look_at - renderer.camera().eye).length() as f32;
    assert!(
        to_surface > to_center - 8.0 && to_surface < to_center - 3.0,
        "surface at {to_surface}, center at {to_center}"
    );
}
