// src/wgpu_utils/binding_types.rs
//! WGPU binding type utilities

pub fn uniform() -> wgpu::BindingType {
    wgpu::BindingType::Buffer {
        ty: wgpu::BufferBindingType::Uniform,
        has_dynamic_offset: false,
        min_binding_size: None,
    }
}

/// Integer texture read with `textureLoad`, never filtered
pub fn utexture_2d() -> wgpu::BindingType {
    wgpu::BindingType::Texture {
        sample_type: wgpu::TextureSampleType::Uint,
        view_dimension: wgpu::TextureViewDimension::D2,
        multisampled: false,
    }
}

pub fn image_2d(
    format: wgpu::TextureFormat,
    access: wgpu::StorageTextureAccess,
) -> wgpu::BindingType {
    wgpu::BindingType::StorageTexture {
        access,
        view_dimension: wgpu::TextureViewDimension::D2,
        format,
    }
}

/// Layout entry shorthand; `count` is always `None` here
pub fn entry(
    binding: u32,
    visibility: wgpu::ShaderStages,
    ty: wgpu::BindingType,
) -> wgpu::BindGroupLayoutEntry {
    wgpu::BindGroupLayoutEntry {
        binding,
        visibility,
        ty,
        count: None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_write_only_image_binding() {
        let ty = image_2d(
            wgpu::TextureFormat::Rgba8Uint,
            wgpu::StorageTextureAccess::WriteOnly,
        );
        assert!(matches!(
            ty,
            wgpu::BindingType::StorageTexture {
                access: wgpu::StorageTextureAccess::WriteOnly,
                format: wgpu::TextureFormat::Rgba8Uint,
                ..
            }
        ));
    }

    #[test]
    fn test_entry_visibility() {
        let layout_entry = entry(2, wgpu::ShaderStages::COMPUTE, utexture_2d());
        assert_eq!(layout_entry.binding, 2);
        assert_eq!(layout_entry.visibility, wgpu::ShaderStages::COMPUTE);
        assert!(layout_entry.count.is_none());
    }
}
