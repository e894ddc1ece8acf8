use std::sync::Arc;
use std::time::Instant;

use anyhow::{anyhow, Context, Result};
use vulkano::device::physical::{PhysicalDevice, PhysicalDeviceType};
use vulkano::device::{Device, DeviceCreateInfo, DeviceExtensions, Queue, QueueCreateInfo};
use vulkano::image::view::ImageView;
use vulkano::image::{ImageUsage, SwapchainImage};
use vulkano::instance::{Instance, InstanceCreateInfo};
use vulkano::swapchain::{
    acquire_next_image, AcquireError, Surface, Swapchain, SwapchainCreateInfo,
    SwapchainCreationError, SwapchainPresentInfo,
};
use vulkano::sync::{self, FlushError, GpuFuture};
use vulkano::VulkanLibrary;
use vulkano_win::VkSurfaceBuild;

use winit::{
    dpi::LogicalSize,
    event::{Event, WindowEvent},
    event_loop::{ControlFlow, EventLoop},
    window::{CursorGrabMode, Window, WindowBuilder},
};

use super::demo_scene::DemoScene;
use super::input::{InputAction, InputHandler};
use super::settings::Settings;
use crate::frame::scene_renderer::SceneRenderer;

type SwapchainImages = Vec<Arc<ImageView<SwapchainImage<Window>>>>;

fn create_instance() -> Result<Arc<Instance>> {
    let library = VulkanLibrary::new().context("loading the Vulkan library")?;
    let required_extensions = vulkano_win::required_extensions(&library);
    Instance::new(
        library,
        InstanceCreateInfo {
            enabled_extensions: required_extensions,
            // devices on top of non-conformant implementations (ex. MoltenVK)
            enumerate_portability: true,
            ..Default::default()
        },
    )
    .context("creating the Vulkan instance")
}

fn create_surface(
    instance: Arc<Instance>,
    settings: &Settings,
) -> Result<(Arc<Surface<Window>>, EventLoop<()>)> {
    let event_loop = EventLoop::new();
    let surface = WindowBuilder::new()
        .with_title(settings.window.title.clone())
        .with_inner_size(LogicalSize::new(settings.window.width, settings.window.height))
        .build_vk_surface(&event_loop, instance)
        .context("creating the window surface")?;
    Ok((surface, event_loop))
}

fn create_device(
    surface: &Arc<Surface<Window>>,
    instance: &Arc<Instance>,
) -> Result<(Arc<Device>, Arc<Queue>)> {
    let device_extensions = DeviceExtensions {
        khr_swapchain: true,
        ..DeviceExtensions::empty()
    };
    let (physical_device, queue_family_index) = instance
        .enumerate_physical_devices()?
        .filter(|p| p.supported_extensions().contains(&device_extensions))
        .filter_map(|p| graphics_queue_family(&p, surface).map(|i| (p, i)))
        .min_by_key(|(p, _)| match p.properties().device_type {
            PhysicalDeviceType::DiscreteGpu => 0,
            PhysicalDeviceType::IntegratedGpu => 1,
            PhysicalDeviceType::VirtualGpu => 2,
            PhysicalDeviceType::Cpu => 3,
            PhysicalDeviceType::Other => 4,
            _ => 5,
        })
        .ok_or_else(|| anyhow!("no device can present to this window"))?;

    log::info!(
        "using device: {} (type: {:?})",
        physical_device.properties().device_name,
        physical_device.properties().device_type
    );

    let (device, mut queues) = Device::new(
        physical_device,
        DeviceCreateInfo {
            enabled_extensions: device_extensions,
            queue_create_infos: vec![QueueCreateInfo {
                queue_family_index,
                ..Default::default()
            }],
            ..Default::default()
        },
    )
    .context("creating the logical device")?;
    let queue = queues
        .next()
        .ok_or_else(|| anyhow!("device returned no queue"))?;
    Ok((device, queue))
}

fn graphics_queue_family(device: &Arc<PhysicalDevice>, surface: &Arc<Surface<Window>>) -> Option<u32> {
    device
        .queue_family_properties()
        .iter()
        .enumerate()
        .position(|(i, q)| {
            q.queue_flags.graphics && device.surface_support(i as u32, surface).unwrap_or(false)
        })
        .map(|i| i as u32)
}

fn views(images: Vec<Arc<SwapchainImage<Window>>>) -> Result<SwapchainImages> {
    images
        .into_iter()
        .map(|image| ImageView::new_default(image).context("creating a swapchain view"))
        .collect()
}

fn create_swapchain(
    device: Arc<Device>,
    surface: Arc<Surface<Window>>,
) -> Result<(Arc<Swapchain<Window>>, SwapchainImages)> {
    let surface_capabilities = device
        .physical_device()
        .surface_capabilities(&surface, Default::default())?;
    let image_format = device
        .physical_device()
        .surface_formats(&surface, Default::default())?
        .first()
        .map(|(format, _)| *format);
    let composite_alpha = surface_capabilities
        .supported_composite_alpha
        .iter()
        .next()
        .ok_or_else(|| anyhow!("surface supports no composite alpha mode"))?;

    let (swapchain, images) = Swapchain::new(
        device,
        surface.clone(),
        SwapchainCreateInfo {
            min_image_count: surface_capabilities.min_image_count + 1,
            image_format,
            image_extent: surface.window().inner_size().into(),
            image_usage: ImageUsage {
                color_attachment: true,
                ..ImageUsage::empty()
            },
            composite_alpha,
            ..Default::default()
        },
    )
    .context("creating the swapchain")?;
    Ok((swapchain, views(images)?))
}

fn grab_cursor(window: &Window, locked: bool) {
    let grab = if locked {
        window
            .set_cursor_grab(CursorGrabMode::Confined)
            .or_else(|_| window.set_cursor_grab(CursorGrabMode::Locked))
    } else {
        window.set_cursor_grab(CursorGrabMode::None)
    };
    if let Err(e) = grab {
        log::warn!("cursor grab: {}", e);
    }
    window.set_cursor_visible(!locked);
}

/// Opens the window and runs the demo scene until it is closed.
pub fn run(settings: Settings) -> Result<()> {
    let instance = create_instance()?;
    let (surface, event_loop) = create_surface(instance.clone(), &settings)?;
    let (device, queue) = create_device(&surface, &instance)?;
    let (mut swapchain, mut images) = create_swapchain(device.clone(), surface.clone())?;

    let extent = swapchain.image_extent();
    let mut renderer = SceneRenderer::new(queue.clone(), swapchain.image_format(), extent)?;
    let mut demo = DemoScene::build(&mut renderer, &settings)?;
    demo.scene.resize(&mut renderer, extent[0], extent[1]);

    let mut input = InputHandler::new();
    let mut recreate_swapchain = false;
    let mut previous_frame_end = Some(sync::now(device.clone()).boxed());
    let mut last_frame = Instant::now();

    event_loop.run(move |event, _, control_flow| match event {
        Event::WindowEvent {
            event: WindowEvent::CloseRequested,
            ..
        } => {
            *control_flow = ControlFlow::Exit;
        }
        Event::WindowEvent {
            event: WindowEvent::Resized(_),
            ..
        } => {
            recreate_swapchain = true;
        }
        Event::WindowEvent { event, .. } => match input.handle_window_event(&event) {
            Some(InputAction::Close) => *control_flow = ControlFlow::Exit,
            Some(InputAction::CursorLock(locked)) => grab_cursor(surface.window(), locked),
            Some(InputAction::TogglePipeline) => demo.toggle_pipeline(&mut renderer),
            Some(action) => {
                demo.apply_action(action);
            }
            None => (),
        },
        Event::RedrawEventsCleared => {
            let dimensions = surface.window().inner_size();
            if dimensions.width == 0 || dimensions.height == 0 {
                return;
            }
            if let Some(previous) = previous_frame_end.as_mut() {
                previous.cleanup_finished();
            }

            if recreate_swapchain {
                let (new_swapchain, new_images) = match swapchain.recreate(SwapchainCreateInfo {
                    image_extent: dimensions.into(),
                    ..swapchain.create_info()
                }) {
                    Ok(r) => r,
                    Err(SwapchainCreationError::ImageExtentNotSupported { .. }) => return,
                    Err(e) => {
                        log::error!("failed to recreate swapchain: {}", e);
                        *control_flow = ControlFlow::Exit;
                        return;
                    }
                };
                images = match views(new_images) {
                    Ok(views) => views,
                    Err(e) => {
                        log::error!("{:#}", e);
                        *control_flow = ControlFlow::Exit;
                        return;
                    }
                };
                swapchain = new_swapchain;
                let [width, height] = swapchain.image_extent();
                renderer.set_viewport_dimensions([width, height]);
                demo.scene.resize(&mut renderer, width, height);
                recreate_swapchain = false;
            }

            let (image_index, suboptimal, acquire_future) =
                match acquire_next_image(swapchain.clone(), None) {
                    Ok(r) => r,
                    Err(AcquireError::OutOfDate) => {
                        recreate_swapchain = true;
                        return;
                    }
                    Err(e) => {
                        log::error!("failed to acquire next image: {}", e);
                        return;
                    }
                };
            if suboptimal {
                recreate_swapchain = true;
            }

            let now = Instant::now();
            let delta_time = now.duration_since(last_frame).as_secs_f32();
            last_frame = now;
            demo.step(&mut input, delta_time);

            let image = images[image_index as usize].clone();
            let command_buffer = match renderer.begin_frame(image).and_then(|()| {
                demo.scene.render(&mut renderer);
                renderer.end_frame()
            }) {
                Ok(command_buffer) => command_buffer,
                Err(e) => {
                    log::error!("frame dropped: {}", e);
                    return;
                }
            };

            let future = match previous_frame_end
                .take()
                .unwrap_or_else(|| sync::now(device.clone()).boxed())
                .join(acquire_future)
                .then_execute(queue.clone(), command_buffer)
            {
                Ok(future) => future,
                Err(e) => {
                    log::error!("failed to submit frame: {}", e);
                    previous_frame_end = Some(sync::now(device.clone()).boxed());
                    return;
                }
            };

            let future = future
                .then_swapchain_present(
                    queue.clone(),
                    SwapchainPresentInfo::swapchain_image_index(swapchain.clone(), image_index),
                )
                .then_signal_fence_and_flush();

            match future {
                Ok(future) => {
                    previous_frame_end = Some(future.boxed());
                }
                Err(FlushError::OutOfDate) => {
                    recreate_swapchain = true;
                    previous_frame_end = Some(sync::now(device.clone()).boxed());
                }
                Err(e) => {
                    log::error!("failed to flush future: {}", e);
                    previous_frame_end = Some(sync::now(device.clone()).boxed());
                }
            }
        }
        _ => (),
    })
}
