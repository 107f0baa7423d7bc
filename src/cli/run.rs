use {
    crate::{
        cli::{RunArgs, load_config},
        config::ConfigError,
        display::{DisplayDeps, DisplayError, HwcDisplay},
        engine::PowerMode,
        error::HwcError,
        format::{BufferInfo, Dataspace, Format},
        layer::{Composition, Rect},
        manager::HwcManager,
        sim::{RecordingCallbacks, SimEngine, signaled_fence},
        time::now_nsec,
        validate::ValidateOutcome,
    },
    hwc_algorithms::rect::FRect,
    std::rc::Rc,
    thiserror::Error,
};

const WIDTH: u32 = 1080;
const LAYER_HEIGHT: u32 = 200;

#[derive(Debug, Error)]
pub enum RunError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("Could not create the display")]
    CreateDisplay(#[from] DisplayError),
    #[error("Could not power on the display")]
    PowerOn(#[source] HwcError),
    #[error("Could not set up layer {0}")]
    Layer(u32, #[source] HwcError),
    #[error("Frame {0} failed")]
    Frame(u64, #[source] HwcError),
}

fn buffer(handle_id: u64, height: u32) -> BufferInfo {
    BufferInfo {
        handle_id,
        format: Format::Rgba8888,
        width: WIDTH,
        height,
        unaligned_width: WIDTH,
        unaligned_height: height,
        ..Default::default()
    }
}

pub fn main(args: RunArgs) -> Result<(), RunError> {
    let config = load_config(args.config.as_deref())?;
    let manager = HwcManager::default();
    let engine = Rc::new(SimEngine::default());
    let callbacks = Rc::new(RecordingCallbacks::default());
    let display = manager.create_display(
        config,
        DisplayDeps {
            engine: engine.clone(),
            callbacks: callbacks.clone(),
            tone_mapper: None,
            cwb_handler: None,
        },
    )?;
    display
        .set_power_mode(PowerMode::On, false)
        .map_err(RunError::PowerOn)?;
    let mut layers = vec![];
    for i in 0..args.layers {
        let id = display.create_layer();
        display
            .set_layer_z_order(id, i)
            .map_err(|e| RunError::Layer(i, e))?;
        let layer = display.layer(id).map_err(|e| RunError::Layer(i, e))?;
        layer
            .set_composition_type(Composition::Device)
            .map_err(|e| RunError::Layer(i, e))?;
        let top = (i * LAYER_HEIGHT) as i32;
        layer.set_display_frame(Rect::new(0, top, WIDTH as i32, top + LAYER_HEIGHT as i32));
        layer.set_source_crop(FRect::new(0.0, 0.0, WIDTH as f32, LAYER_HEIGHT as f32));
        layer.set_dataspace(Dataspace::V0_SRGB);
        layers.push(layer);
    }
    let mut next_handle = 1;
    for frame in 0..args.frames {
        let height = LAYER_HEIGHT * args.layers.max(1);
        display
            .set_client_target(
                Some(&buffer(next_handle, height)),
                signaled_fence(),
                Dataspace::V0_SRGB,
                &[],
            )
            .map_err(|e| RunError::Frame(frame, e))?;
        next_handle += 1;
        for layer in &layers {
            layer
                .set_buffer(Some(&buffer(next_handle, LAYER_HEIGHT)), signaled_fence())
                .map_err(|e| RunError::Frame(frame, e))?;
            next_handle += 1;
        }
        present_frame(&display, frame)?;
        display.on_vsync(now_nsec());
    }
    log::info!(
        "Presented {} frames with {} commits and {} refresh requests",
        args.frames,
        engine.calls.commit.get(),
        callbacks.refreshes.get(),
    );
    Ok(())
}

fn present_frame(display: &HwcDisplay, frame: u64) -> Result<(), RunError> {
    let res = display.validate().map_err(|e| RunError::Frame(frame, e))?;
    if res.outcome == ValidateOutcome::HasChanges {
        let changes = display
            .changed_composition_types()
            .map_err(|e| RunError::Frame(frame, e))?;
        for (id, composition) in &changes {
            log::info!("Frame {}: Layer {} changed to {:?}", frame, id, composition);
        }
        display
            .accept_changes()
            .map_err(|e| RunError::Frame(frame, e))?;
    }
    let retire_fence = display.present().map_err(|e| RunError::Frame(frame, e))?;
    log::info!(
        "Frame {}: {} type changes, {} requests, retire fence {}",
        frame,
        res.num_types,
        res.num_requests,
        if retire_fence.is_some() { "present" } else { "absent" },
    );
    Ok(())
}
