use std::collections::BTreeMap;
use std::ops::Range;

use glam::Mat4;
use mapview_assets::{AssetId, AssetLoader};
use mapview_render::{DrawItem, FramePlan, LoadStage, MapViewer, RenderPass, SplatDraw, SplatLayer};
use mapview_terrain::TerrainPalette;
use wgpu::util::DeviceExt;

use crate::mesh::{self, InstanceData, MeshBatch, Vertex};
use crate::shaders;

#[repr(C)]
#[derive(Copy, Clone, bytemuck::Pod, bytemuck::Zeroable)]
struct Uniforms {
    view_proj: [[f32; 4]; 4],
}

struct GpuMesh {
    vertex_buffer: wgpu::Buffer,
    index_buffer: wgpu::Buffer,
    index_count: u32,
}

impl GpuMesh {
    fn upload(device: &wgpu::Device, label: &str, batch: &MeshBatch) -> Option<Self> {
        if batch.indices.is_empty() {
            return None;
        }
        let vertex_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some(label),
            contents: bytemuck::cast_slice(&batch.vertices),
            usage: wgpu::BufferUsages::VERTEX,
        });
        let index_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some(label),
            contents: bytemuck::cast_slice(&batch.indices),
            usage: wgpu::BufferUsages::INDEX,
        });
        Some(Self {
            vertex_buffer,
            index_buffer,
            index_count: batch.indices.len() as u32,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PipelineKind {
    /// Ground layers: blended over each other, depth written.
    Ground,
    /// Cliffs and opaque models.
    Cutout,
    /// Splats: blended, depth tested only.
    Decal,
    /// Water and translucent models.
    Blend,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum MeshRef {
    Ground(usize),
    Water,
    Model(AssetId),
    Splat(SplatLayer, usize, usize),
}

struct DrawCall {
    pipeline: PipelineKind,
    mesh: MeshRef,
    texture: Option<AssetId>,
    instances: Range<u32>,
}

/// Counters for the overlay.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct GpuStats {
    pub textures: usize,
    pub models: usize,
    pub draw_calls: usize,
    pub instances: usize,
}

/// wgpu map renderer. `sync` uploads whatever the viewer has finished loading;
/// `render` draws a frame plan.
pub struct WgpuRenderer {
    ground_pipeline: wgpu::RenderPipeline,
    cutout_pipeline: wgpu::RenderPipeline,
    decal_pipeline: wgpu::RenderPipeline,
    blend_pipeline: wgpu::RenderPipeline,
    uniform_buffer: wgpu::Buffer,
    uniform_bind_group: wgpu::BindGroup,
    texture_layout: wgpu::BindGroupLayout,
    sampler: wgpu::Sampler,
    white: wgpu::BindGroup,
    textures: BTreeMap<AssetId, wgpu::BindGroup>,
    models: BTreeMap<AssetId, GpuMesh>,
    ground: Vec<(u8, GpuMesh)>,
    water: Option<GpuMesh>,
    uber_splats: Vec<Vec<GpuMesh>>,
    selection_splats: Vec<Vec<GpuMesh>>,
    selection_generation: Option<u64>,
    terrain_synced: bool,
    instance_buffer: wgpu::Buffer,
    instance_capacity: usize,
    depth_texture: wgpu::TextureView,
    surface_format: wgpu::TextureFormat,
    stats: GpuStats,
}

#[allow(clippy::too_many_arguments)]
fn create_pipeline(
    device: &wgpu::Device,
    layout: &wgpu::PipelineLayout,
    shader: &wgpu::ShaderModule,
    surface_format: wgpu::TextureFormat,
    label: &str,
    fragment_entry: &str,
    blend: wgpu::BlendState,
    depth_write_enabled: bool,
    depth_compare: wgpu::CompareFunction,
) -> wgpu::RenderPipeline {
    device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
        label: Some(label),
        layout: Some(layout),
        vertex: wgpu::VertexState {
            module: shader,
            entry_point: Some("vs_main"),
            compilation_options: Default::default(),
            buffers: &[
                wgpu::VertexBufferLayout {
                    array_stride: std::mem::size_of::<Vertex>() as u64,
                    step_mode: wgpu::VertexStepMode::Vertex,
                    attributes: &wgpu::vertex_attr_array![
                        0 => Float32x3,
                        1 => Float32x2,
                        2 => Float32x4,
                    ],
                },
                wgpu::VertexBufferLayout {
                    array_stride: std::mem::size_of::<InstanceData>() as u64,
                    step_mode: wgpu::VertexStepMode::Instance,
                    attributes: &wgpu::vertex_attr_array![
                        3 => Float32x4,
                        4 => Float32x4,
                        5 => Float32x4,
                        6 => Float32x4,
                        7 => Float32x4,
                    ],
                },
            ],
        },
        fragment: Some(wgpu::FragmentState {
            module: shader,
            entry_point: Some(fragment_entry),
            compilation_options: Default::default(),
            targets: &[Some(wgpu::ColorTargetState {
                format: surface_format,
                blend: Some(blend),
                write_mask: wgpu::ColorWrites::ALL,
            })],
        }),
        primitive: wgpu::PrimitiveState {
            topology: wgpu::PrimitiveTopology::TriangleList,
            cull_mode: None,
            ..Default::default()
        },
        depth_stencil: Some(wgpu::DepthStencilState {
            format: wgpu::TextureFormat::Depth32Float,
            depth_write_enabled,
            depth_compare,
            stencil: Default::default(),
            bias: Default::default(),
        }),
        multisample: Default::default(),
        multiview: None,
        cache: None,
    })
}

impl WgpuRenderer {
    pub fn new(
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        surface_format: wgpu::TextureFormat,
        width: u32,
        height: u32,
    ) -> Self {
        let uniform_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("uniform_buffer"),
            contents: bytemuck::bytes_of(&Uniforms {
                view_proj: Mat4::IDENTITY.to_cols_array_2d(),
            }),
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
        });

        let uniform_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("uniform_bind_group_layout"),
            entries: &[wgpu::BindGroupLayoutEntry {
                binding: 0,
                visibility: wgpu::ShaderStages::VERTEX,
                ty: wgpu::BindingType::Buffer {
                    ty: wgpu::BufferBindingType::Uniform,
                    has_dynamic_offset: false,
                    min_binding_size: None,
                },
                count: None,
            }],
        });

        let uniform_bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("uniform_bind_group"),
            layout: &uniform_layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: uniform_buffer.as_entire_binding(),
            }],
        });

        let texture_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("texture_bind_group_layout"),
            entries: &[
                wgpu::BindGroupLayoutEntry {
                    binding: 0,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Texture {
                        sample_type: wgpu::TextureSampleType::Float { filterable: true },
                        view_dimension: wgpu::TextureViewDimension::D2,
                        multisampled: false,
                    },
                    count: None,
                },
                wgpu::BindGroupLayoutEntry {
                    binding: 1,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
                    count: None,
                },
            ],
        });

        let sampler = device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some("map_sampler"),
            address_mode_u: wgpu::AddressMode::Repeat,
            address_mode_v: wgpu::AddressMode::Repeat,
            mag_filter: wgpu::FilterMode::Linear,
            min_filter: wgpu::FilterMode::Linear,
            ..Default::default()
        });

        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("pipeline_layout"),
            bind_group_layouts: &[&uniform_layout, &texture_layout],
            push_constant_ranges: &[],
        });

        let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("map_shader"),
            source: wgpu::ShaderSource::Wgsl(shaders::MAP_SHADER.into()),
        });

        let pipeline = |label: &str,
                        entry: &str,
                        blend: wgpu::BlendState,
                        write: bool,
                        compare: wgpu::CompareFunction| {
            create_pipeline(
                device,
                &pipeline_layout,
                &shader,
                surface_format,
                label,
                entry,
                blend,
                write,
                compare,
            )
        };
        let ground_pipeline = pipeline(
            "ground_pipeline",
            "fs_blend",
            wgpu::BlendState::ALPHA_BLENDING,
            true,
            wgpu::CompareFunction::LessEqual,
        );
        let cutout_pipeline = pipeline(
            "cutout_pipeline",
            "fs_cutout",
            wgpu::BlendState::REPLACE,
            true,
            wgpu::CompareFunction::Less,
        );
        let decal_pipeline = pipeline(
            "decal_pipeline",
            "fs_blend",
            wgpu::BlendState::ALPHA_BLENDING,
            false,
            wgpu::CompareFunction::LessEqual,
        );
        let blend_pipeline = pipeline(
            "blend_pipeline",
            "fs_blend",
            wgpu::BlendState::ALPHA_BLENDING,
            false,
            wgpu::CompareFunction::Less,
        );

        let white = Self::upload_texture(
            device,
            queue,
            &texture_layout,
            &sampler,
            "white_texture",
            1,
            1,
            &[255, 255, 255, 255],
        );

        let instance_capacity = 1024;
        let instance_buffer = Self::create_instance_buffer(device, instance_capacity);
        let depth_texture = Self::create_depth_texture(device, width, height);

        Self {
            ground_pipeline,
            cutout_pipeline,
            decal_pipeline,
            blend_pipeline,
            uniform_buffer,
            uniform_bind_group,
            texture_layout,
            sampler,
            white,
            textures: BTreeMap::new(),
            models: BTreeMap::new(),
            ground: Vec::new(),
            water: None,
            uber_splats: Vec::new(),
            selection_splats: Vec::new(),
            selection_generation: None,
            terrain_synced: false,
            instance_buffer,
            instance_capacity,
            depth_texture,
            surface_format,
            stats: GpuStats::default(),
        }
    }

    pub fn resize(&mut self, device: &wgpu::Device, width: u32, height: u32) {
        self.depth_texture = Self::create_depth_texture(device, width, height);
    }

    pub fn surface_format(&self) -> wgpu::TextureFormat {
        self.surface_format
    }

    pub fn stats(&self) -> GpuStats {
        self.stats
    }

    /// Upload everything the viewer finished since the last call. Cheap when
    /// nothing changed.
    pub fn sync(&mut self, device: &wgpu::Device, queue: &wgpu::Queue, viewer: &MapViewer) {
        if viewer.stage() == LoadStage::Shutdown {
            if self.terrain_synced || !self.textures.is_empty() {
                self.release();
            }
            return;
        }
        let loader = viewer.loader();

        let mut wanted: Vec<AssetId> = Vec::new();
        wanted.extend(viewer.ground_textures().iter().flatten());
        wanted.extend(viewer.cliff_textures().iter().flatten());
        wanted.extend(viewer.uber_splats().iter().map(|s| s.texture));
        wanted.extend(viewer.selection_splats().iter().map(|s| s.texture));
        wanted.extend(viewer.water_texture());
        for id in wanted {
            self.ensure_texture(device, queue, loader, id);
        }

        let models = viewer
            .scene()
            .ready_by_model()
            .into_keys()
            .chain(viewer.cliffs().iter().map(|c| c.model));
        for id in models {
            self.ensure_model(device, loader, id);
        }

        if !self.terrain_synced && viewer.is_ready() {
            self.sync_terrain(device, viewer);
        }

        let generation = viewer.selection().generation();
        if self.selection_generation != Some(generation) {
            self.selection_splats = Self::upload_splats(device, viewer, viewer.selection_splats());
            self.selection_generation = Some(generation);
        }
        self.stats.textures = self.textures.len();
        self.stats.models = self.models.len();
    }

    fn sync_terrain(&mut self, device: &wgpu::Device, viewer: &MapViewer) {
        let _span = tracing::info_span!("gpu_sync_terrain").entered();
        if let Some(ground) = viewer.ground() {
            let batches = mesh::ground_batches(ground, &viewer.ground_extended(), viewer.shadow_map());
            self.ground = batches
                .iter()
                .filter_map(|(slot, batch)| {
                    GpuMesh::upload(device, "ground_layer", batch).map(|m| (*slot, m))
                })
                .collect();
        }
        self.water = viewer
            .water()
            .and_then(|water| GpuMesh::upload(device, "water", &mesh::water_batch(water)));
        self.uber_splats = Self::upload_splats(device, viewer, viewer.uber_splats());
        self.terrain_synced = true;
        tracing::debug!(
            ground_layers = self.ground.len(),
            water = self.water.is_some(),
            splats = self.uber_splats.len(),
            "terrain uploaded"
        );
    }

    fn upload_splats(device: &wgpu::Device, viewer: &MapViewer, draws: &[SplatDraw]) -> Vec<Vec<GpuMesh>> {
        let grid = viewer.grid();
        draws
            .iter()
            .map(|draw| {
                draw.batches
                    .iter()
                    .filter_map(|batch| {
                        let cpu = mesh::splat_batch(batch, draw.color, |x, y| grid.height_at(x, y));
                        GpuMesh::upload(device, "splat", &cpu)
                    })
                    .collect()
            })
            .collect()
    }

    fn ensure_texture(
        &mut self,
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        loader: &AssetLoader,
        id: AssetId,
    ) {
        if self.textures.contains_key(&id) {
            return;
        }
        let Some(image) = loader.image(id) else {
            return;
        };
        if image.width == 0 || image.height == 0 {
            return;
        }
        let group = Self::upload_texture(
            device,
            queue,
            &self.texture_layout,
            &self.sampler,
            loader.path(id).unwrap_or("texture"),
            image.width,
            image.height,
            &image.rgba,
        );
        self.textures.insert(id, group);
    }

    fn ensure_model(&mut self, device: &wgpu::Device, loader: &AssetLoader, id: AssetId) {
        if self.models.contains_key(&id) {
            return;
        }
        let Some(mesh) = loader.model(id).and_then(|m| m.mesh.as_ref()) else {
            return;
        };
        let label = loader.path(id).unwrap_or("model");
        if let Some(gpu) = GpuMesh::upload(device, label, &mesh::model_batch(mesh)) {
            self.models.insert(id, gpu);
        }
    }

    /// Drop every upload; used once the viewer shuts down.
    fn release(&mut self) {
        self.textures.clear();
        self.models.clear();
        self.ground.clear();
        self.water = None;
        self.uber_splats.clear();
        self.selection_splats.clear();
        self.selection_generation = None;
        self.terrain_synced = false;
        self.stats = GpuStats::default();
        tracing::debug!("gpu resources released");
    }

    /// Turn the plan into draw calls, packing model and cliff instances into one buffer.
    fn draw_calls(&self, viewer: &MapViewer, plan: &FramePlan) -> (Vec<DrawCall>, Vec<InstanceData>) {
        let mut instances = vec![InstanceData::identity()];
        let mut calls = Vec::new();
        let single = 0..1;

        for pass in &plan.passes {
            for item in &pass.items {
                match item {
                    DrawItem::Ground { .. } => {
                        for (index, (slot, _)) in self.ground.iter().enumerate() {
                            calls.push(DrawCall {
                                pipeline: PipelineKind::Ground,
                                mesh: MeshRef::Ground(index),
                                texture: viewer.ground_textures().get(*slot as usize).copied().flatten(),
                                instances: single.clone(),
                            });
                        }
                    }
                    DrawItem::Cliffs { index, model, .. } => {
                        let Some(cliff) = viewer.cliffs().get(*index) else {
                            continue;
                        };
                        let mut by_slot: BTreeMap<u8, Vec<InstanceData>> = BTreeMap::new();
                        for instance in &cliff.set.instances {
                            by_slot
                                .entry(TerrainPalette::cliff_slot(instance.texture))
                                .or_default()
                                .push(InstanceData::new(Mat4::from_translation(instance.position), [1.0; 4]));
                        }
                        for (slot, group) in by_slot {
                            let start = instances.len() as u32;
                            instances.extend(group);
                            let texture = if cliff.set.own_textures {
                                None
                            } else {
                                viewer.cliff_textures().get(slot as usize).copied().flatten()
                            };
                            calls.push(DrawCall {
                                pipeline: PipelineKind::Cutout,
                                mesh: MeshRef::Model(*model),
                                texture,
                                instances: start..instances.len() as u32,
                            });
                        }
                    }
                    DrawItem::Models { model, instances: list } => {
                        let start = instances.len() as u32;
                        instances.extend(list.iter().map(|i| InstanceData::new(i.matrix, i.tint)));
                        calls.push(DrawCall {
                            pipeline: if pass.pass == RenderPass::TranslucentModels {
                                PipelineKind::Blend
                            } else {
                                PipelineKind::Cutout
                            },
                            mesh: MeshRef::Model(*model),
                            texture: None,
                            instances: start..instances.len() as u32,
                        });
                    }
                    DrawItem::Splats {
                        layer,
                        index,
                        texture,
                        ..
                    } => {
                        let uploaded = match layer {
                            SplatLayer::Uber => &self.uber_splats,
                            SplatLayer::Selection => &self.selection_splats,
                        };
                        let count = uploaded.get(*index).map_or(0, Vec::len);
                        for batch in 0..count {
                            calls.push(DrawCall {
                                pipeline: PipelineKind::Decal,
                                mesh: MeshRef::Splat(*layer, *index, batch),
                                texture: Some(*texture),
                                instances: single.clone(),
                            });
                        }
                    }
                    DrawItem::Water { texture, .. } => calls.push(DrawCall {
                        pipeline: PipelineKind::Blend,
                        mesh: MeshRef::Water,
                        texture: Some(*texture),
                        instances: single.clone(),
                    }),
                }
            }
        }
        (calls, instances)
    }

    fn mesh(&self, mesh: MeshRef) -> Option<&GpuMesh> {
        match mesh {
            MeshRef::Ground(index) => self.ground.get(index).map(|(_, m)| m),
            MeshRef::Water => self.water.as_ref(),
            MeshRef::Model(id) => self.models.get(&id),
            MeshRef::Splat(SplatLayer::Uber, index, batch) => self.uber_splats.get(index)?.get(batch),
            MeshRef::Splat(SplatLayer::Selection, index, batch) => {
                self.selection_splats.get(index)?.get(batch)
            }
        }
    }

    fn pipeline(&self, kind: PipelineKind) -> &wgpu::RenderPipeline {
        match kind {
            PipelineKind::Ground => &self.ground_pipeline,
            PipelineKind::Cutout => &self.cutout_pipeline,
            PipelineKind::Decal => &self.decal_pipeline,
            PipelineKind::Blend => &self.blend_pipeline,
        }
    }

    /// Render one frame plan into `view`.
    pub fn render(
        &mut self,
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        view: &wgpu::TextureView,
        viewer: &MapViewer,
        plan: &FramePlan,
    ) {
        queue.write_buffer(
            &self.uniform_buffer,
            0,
            bytemuck::bytes_of(&Uniforms {
                view_proj: plan.view_projection.to_cols_array_2d(),
            }),
        );

        let (calls, instances) = self.draw_calls(viewer, plan);
        if instances.len() > self.instance_capacity {
            self.instance_capacity = instances.len().next_power_of_two();
            self.instance_buffer = Self::create_instance_buffer(device, self.instance_capacity);
        }
        queue.write_buffer(&self.instance_buffer, 0, bytemuck::cast_slice(&instances));

        let mut encoder = device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
            label: Some("render_encoder"),
        });

        let mut drawn = 0;
        {
            let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("map_pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(wgpu::Color {
                            r: 0.05,
                            g: 0.05,
                            b: 0.08,
                            a: 1.0,
                        }),
                        store: wgpu::StoreOp::Store,
                    },
                })],
                depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                    view: &self.depth_texture,
                    depth_ops: Some(wgpu::Operations {
                        load: wgpu::LoadOp::Clear(1.0),
                        store: wgpu::StoreOp::Store,
                    }),
                    stencil_ops: None,
                }),
                ..Default::default()
            });

            pass.set_bind_group(0, &self.uniform_bind_group, &[]);
            pass.set_vertex_buffer(1, self.instance_buffer.slice(..));
            for call in &calls {
                let Some(mesh) = self.mesh(call.mesh) else {
                    continue;
                };
                let texture = call
                    .texture
                    .and_then(|id| self.textures.get(&id))
                    .unwrap_or(&self.white);
                pass.set_pipeline(self.pipeline(call.pipeline));
                pass.set_bind_group(1, texture, &[]);
                pass.set_vertex_buffer(0, mesh.vertex_buffer.slice(..));
                pass.set_index_buffer(mesh.index_buffer.slice(..), wgpu::IndexFormat::Uint32);
                pass.draw_indexed(0..mesh.index_count, 0, call.instances.clone());
                drawn += 1;
            }
        }

        queue.submit(std::iter::once(encoder.finish()));
        self.stats.draw_calls = drawn;
        self.stats.instances = instances.len() - 1;
    }

    #[allow(clippy::too_many_arguments)]
    fn upload_texture(
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        layout: &wgpu::BindGroupLayout,
        sampler: &wgpu::Sampler,
        label: &str,
        width: u32,
        height: u32,
        rgba: &[u8],
    ) -> wgpu::BindGroup {
        let texture = device.create_texture_with_data(
            queue,
            &wgpu::TextureDescriptor {
                label: Some(label),
                size: wgpu::Extent3d {
                    width,
                    height,
                    depth_or_array_layers: 1,
                },
                mip_level_count: 1,
                sample_count: 1,
                dimension: wgpu::TextureDimension::D2,
                format: wgpu::TextureFormat::Rgba8UnormSrgb,
                usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
                view_formats: &[],
            },
            wgpu::util::TextureDataOrder::LayerMajor,
            rgba,
        );
        let view = texture.create_view(&Default::default());
        device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some(label),
            layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: wgpu::BindingResource::TextureView(&view),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: wgpu::BindingResource::Sampler(sampler),
                },
            ],
        })
    }

    fn create_instance_buffer(device: &wgpu::Device, capacity: usize) -> wgpu::Buffer {
        device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("instance_buffer"),
            size: (capacity * std::mem::size_of::<InstanceData>()) as u64,
            usage: wgpu::BufferUsages::VERTEX | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        })
    }

    fn create_depth_texture(
        device: &wgpu::Device,
        width: u32,
        height: u32,
    ) -> wgpu::TextureView {
        let texture = device.create_texture(&wgpu::TextureDescriptor {
            label: Some("depth_texture"),
            size: wgpu::Extent3d {
                width: width.max(1),
                height: height.max(1),
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: wgpu::TextureFormat::Depth32Float,
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            view_formats: &[],
        });
        texture.create_view(&Default::default())
    }
}
