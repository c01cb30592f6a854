use super::gpu::{LineVertex, MeshVertex};
use super::shadow::SHADOW_FORMAT;

pub const DEPTH_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Depth32Float;

const COMMON_WGSL: &str = include_str!("shaders/common.wgsl");

/// Bind group layouts shared between pipelines and `RenderContext`.
pub struct Layouts {
    /// Frame + light uniforms, shadow array and comparison sampler.
    pub frame: wgpu::BindGroupLayout,
    /// Per-mesh uniform, dynamic offset.
    pub mesh: wgpu::BindGroupLayout,
    /// Light-space matrix of one depth pass, dynamic offset.
    pub depth_pass: wgpu::BindGroupLayout,
    pub contact: wgpu::BindGroupLayout,
    pub grid: wgpu::BindGroupLayout,
}

impl Layouts {
    pub fn new(device: &wgpu::Device) -> Self {
        let vertex_fragment = wgpu::ShaderStages::VERTEX | wgpu::ShaderStages::FRAGMENT;
        let frame = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("frame layout"),
            entries: &[
                uniform_entry(0, vertex_fragment, false),
                uniform_entry(1, wgpu::ShaderStages::FRAGMENT, false),
                wgpu::BindGroupLayoutEntry {
                    binding: 2,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Texture {
                        sample_type: wgpu::TextureSampleType::Depth,
                        view_dimension: wgpu::TextureViewDimension::D2Array,
                        multisampled: false,
                    },
                    count: None,
                },
                wgpu::BindGroupLayoutEntry {
                    binding: 3,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Comparison),
                    count: None,
                },
            ],
        });
        let mesh = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("mesh layout"),
            entries: &[uniform_entry(0, vertex_fragment, true)],
        });
        let depth_pass = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("depth pass layout"),
            entries: &[uniform_entry(0, wgpu::ShaderStages::VERTEX, true)],
        });
        let contact = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("contact shadow layout"),
            entries: &[
                uniform_entry(0, vertex_fragment, false),
                wgpu::BindGroupLayoutEntry {
                    binding: 1,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Texture {
                        sample_type: wgpu::TextureSampleType::Depth,
                        view_dimension: wgpu::TextureViewDimension::D2,
                        multisampled: false,
                    },
                    count: None,
                },
            ],
        });
        let grid = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("grid layout"),
            entries: &[uniform_entry(0, vertex_fragment, false)],
        });
        Self {
            frame,
            mesh,
            depth_pass,
            contact,
            grid,
        }
    }
}

fn uniform_entry(
    binding: u32,
    visibility: wgpu::ShaderStages,
    has_dynamic_offset: bool,
) -> wgpu::BindGroupLayoutEntry {
    wgpu::BindGroupLayoutEntry {
        binding,
        visibility,
        ty: wgpu::BindingType::Buffer {
            ty: wgpu::BufferBindingType::Uniform,
            has_dynamic_offset,
            min_binding_size: None,
        },
        count: None,
    }
}

pub struct Pipelines {
    pub shadow: wgpu::RenderPipeline,
    pub contact_capture: wgpu::RenderPipeline,
    pub lit_opaque: wgpu::RenderPipeline,
    pub lit_blended: wgpu::RenderPipeline,
    pub grid: wgpu::RenderPipeline,
    pub contact_plane: wgpu::RenderPipeline,
    pub lines: wgpu::RenderPipeline,
}

impl Pipelines {
    pub fn new(device: &wgpu::Device, layouts: &Layouts, color_format: wgpu::TextureFormat) -> Self {
        let lit = shader(device, "lit shader", include_str!("shaders/lit.wgsl"));
        let depth = shader(device, "depth shader", include_str!("shaders/depth.wgsl"));
        let grid = shader(device, "grid shader", include_str!("shaders/grid.wgsl"));
        let contact = shader(
            device,
            "contact shadow shader",
            include_str!("shaders/contact_shadow.wgsl"),
        );
        let line = shader(device, "line shader", include_str!("shaders/line.wgsl"));

        let lit_layout = pipeline_layout(device, "lit layout", &[&layouts.frame, &layouts.mesh]);
        let depth_layout =
            pipeline_layout(device, "depth layout", &[&layouts.depth_pass, &layouts.mesh]);
        let grid_layout = pipeline_layout(device, "grid layout", &[&layouts.frame, &layouts.grid]);
        let contact_layout =
            pipeline_layout(device, "contact layout", &[&layouts.frame, &layouts.contact]);
        let line_layout = pipeline_layout(device, "line layout", &[&layouts.frame]);

        let shadow_bias = wgpu::DepthBiasState {
            constant: 2,
            slope_scale: 2.0,
            clamp: 0.0,
        };

        Self {
            shadow: depth_pipeline(device, &depth_layout, &depth, "shadow pipeline", shadow_bias),
            contact_capture: depth_pipeline(
                device,
                &depth_layout,
                &depth,
                "contact capture pipeline",
                wgpu::DepthBiasState::default(),
            ),
            lit_opaque: lit_pipeline(device, &lit_layout, &lit, color_format, false),
            lit_blended: lit_pipeline(device, &lit_layout, &lit, color_format, true),
            grid: overlay_pipeline(device, &grid_layout, &grid, color_format, "grid pipeline"),
            contact_plane: overlay_pipeline(
                device,
                &contact_layout,
                &contact,
                color_format,
                "contact plane pipeline",
            ),
            lines: line_pipeline(device, &line_layout, &line, color_format),
        }
    }
}

fn shader(device: &wgpu::Device, label: &str, source: &str) -> wgpu::ShaderModule {
    let full_source = format!("{COMMON_WGSL}\n{source}");
    device.create_shader_module(wgpu::ShaderModuleDescriptor {
        label: Some(label),
        source: wgpu::ShaderSource::Wgsl(full_source.into()),
    })
}

fn pipeline_layout(
    device: &wgpu::Device,
    label: &str,
    bind_group_layouts: &[&wgpu::BindGroupLayout],
) -> wgpu::PipelineLayout {
    device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
        label: Some(label),
        bind_group_layouts,
        push_constant_ranges: &[],
    })
}

fn depth_state(write: bool, bias: wgpu::DepthBiasState) -> wgpu::DepthStencilState {
    wgpu::DepthStencilState {
        format: DEPTH_FORMAT,
        depth_write_enabled: write,
        depth_compare: wgpu::CompareFunction::LessEqual,
        stencil: wgpu::StencilState::default(),
        bias,
    }
}

fn depth_pipeline(
    device: &wgpu::Device,
    layout: &wgpu::PipelineLayout,
    module: &wgpu::ShaderModule,
    label: &str,
    bias: wgpu::DepthBiasState,
) -> wgpu::RenderPipeline {
    device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
        label: Some(label),
        layout: Some(layout),
        vertex: wgpu::VertexState {
            module,
            entry_point: Some("vs_main"),
            compilation_options: Default::default(),
            buffers: &[MeshVertex::layout()],
        },
        fragment: None,
        primitive: wgpu::PrimitiveState {
            topology: wgpu::PrimitiveTopology::TriangleList,
            cull_mode: None,
            ..Default::default()
        },
        depth_stencil: Some(wgpu::DepthStencilState {
            format: SHADOW_FORMAT,
            ..depth_state(true, bias)
        }),
        multisample: wgpu::MultisampleState::default(),
        multiview: None,
        cache: None,
    })
}

fn lit_pipeline(
    device: &wgpu::Device,
    layout: &wgpu::PipelineLayout,
    module: &wgpu::ShaderModule,
    color_format: wgpu::TextureFormat,
    blended: bool,
) -> wgpu::RenderPipeline {
    let (label, blend) = if blended {
        ("lit pipeline (blended)", wgpu::BlendState::ALPHA_BLENDING)
    } else {
        ("lit pipeline", wgpu::BlendState::REPLACE)
    };
    device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
        label: Some(label),
        layout: Some(layout),
        vertex: wgpu::VertexState {
            module,
            entry_point: Some("vs_main"),
            compilation_options: Default::default(),
            buffers: &[MeshVertex::layout()],
        },
        fragment: Some(wgpu::FragmentState {
            module,
            entry_point: Some("fs_main"),
            compilation_options: Default::default(),
            targets: &[Some(wgpu::ColorTargetState {
                format: color_format,
                blend: Some(blend),
                write_mask: wgpu::ColorWrites::ALL,
            })],
        }),
        primitive: wgpu::PrimitiveState {
            topology: wgpu::PrimitiveTopology::TriangleList,
            front_face: wgpu::FrontFace::Ccw,
            cull_mode: Some(wgpu::Face::Back),
            ..Default::default()
        },
        depth_stencil: Some(depth_state(true, wgpu::DepthBiasState::default())),
        multisample: wgpu::MultisampleState::default(),
        multiview: None,
        cache: None,
    })
}

/// Alpha-blended, procedurally generated quads: depth tested, never written.
fn overlay_pipeline(
    device: &wgpu::Device,
    layout: &wgpu::PipelineLayout,
    module: &wgpu::ShaderModule,
    color_format: wgpu::TextureFormat,
    label: &str,
) -> wgpu::RenderPipeline {
    device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
        label: Some(label),
        layout: Some(layout),
        vertex: wgpu::VertexState {
            module,
            entry_point: Some("vs_main"),
            compilation_options: Default::default(),
            buffers: &[],
        },
        fragment: Some(wgpu::FragmentState {
            module,
            entry_point: Some("fs_main"),
            compilation_options: Default::default(),
            targets: &[Some(wgpu::ColorTargetState {
                format: color_format,
                blend: Some(wgpu::BlendState::ALPHA_BLENDING),
                write_mask: wgpu::ColorWrites::ALL,
            })],
        }),
        primitive: wgpu::PrimitiveState {
            topology: wgpu::PrimitiveTopology::TriangleList,
            cull_mode: None,
            ..Default::default()
        },
        depth_stencil: Some(depth_state(false, wgpu::DepthBiasState::default())),
        multisample: wgpu::MultisampleState::default(),
        multiview: None,
        cache: None,
    })
}

fn line_pipeline(
    device: &wgpu::Device,
    layout: &wgpu::PipelineLayout,
    module: &wgpu::ShaderModule,
    color_format: wgpu::TextureFormat,
) -> wgpu::RenderPipeline {
    device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
        label: Some("line pipeline"),
        layout: Some(layout),
        vertex: wgpu::VertexState {
            module,
            entry_point: Some("vs_main"),
            compilation_options: Default::default(),
            buffers: &[LineVertex::layout()],
        },
        fragment: Some(wgpu::FragmentState {
            module,
            entry_point: Some("fs_main"),
            compilation_options: Default::default(),
            targets: &[Some(wgpu::ColorTargetState {
                format: color_format,
                blend: Some(wgpu::BlendState::REPLACE),
                write_mask: wgpu::ColorWrites::ALL,
            })],
        }),
        primitive: wgpu::PrimitiveState {
            topology: wgpu::PrimitiveTopology::LineList,
            ..Default::default()
        },
        depth_stencil: Some(depth_state(false, wgpu::DepthBiasState::default())),
        multisample: wgpu::MultisampleState::default(),
        multiview: None,
        cache: None,
    })
}
