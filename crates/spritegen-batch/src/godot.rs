//! Godot 4 `SpriteFrames` resource export.
//!
//! Renders [`AnimationMetadata`] as a text resource (`.tres`) that Godot can
//! load into an `AnimatedSprite2D`. Each sheet becomes an external
//! `Texture2D`, each frame rectangle an `AtlasTexture` sub-resource.

use std::collections::BTreeMap;
use std::fmt::Write;

use crate::metadata::AnimationMetadata;

/// Renders a `SpriteFrames` resource for one rig.
///
/// `resource_dir` is the Godot path prefix the sheets live under, such as
/// `res://spritesheets`.
pub fn sprite_frames_tres(metadata: &AnimationMetadata, resource_dir: &str) -> String {
    let prefix = resource_dir.trim_end_matches('/');

    let mut textures: BTreeMap<&str, usize> = BTreeMap::new();
    for sheet in metadata.sheets() {
        let id = textures.len() + 1;
        textures.insert(sheet, id);
    }
    let atlas_count: usize = metadata.animations.iter().map(|a| a.frames.len()).sum();
    let load_steps = textures.len() + atlas_count + 1;

    let mut out = String::new();
    // Writing to a String cannot fail.
    let _ = writeln!(
        out,
        "[gd_resource type=\"SpriteFrames\" load_steps={} format=3]",
        load_steps
    );
    out.push('\n');

    for (sheet, id) in &textures {
        let _ = writeln!(
            out,
            "[ext_resource type=\"Texture2D\" path=\"{}\" id=\"{}\"]",
            escape(&format!("{prefix}/{sheet}")),
            id
        );
    }
    out.push('\n');

    let mut atlas_ids: Vec<Vec<usize>> = Vec::with_capacity(metadata.animations.len());
    let mut next_atlas = 1;
    for animation in &metadata.animations {
        let texture = textures.get(animation.sheet.as_str()).copied().unwrap_or(1);
        let mut ids = Vec::with_capacity(animation.frames.len());
        for rect in &animation.frames {
            let _ = writeln!(
                out,
                "[sub_resource type=\"AtlasTexture\" id=\"AtlasTexture_{}\"]",
                next_atlas
            );
            let _ = writeln!(out, "atlas = ExtResource(\"{}\")", texture);
            let _ = writeln!(
                out,
                "region = Rect2({}, {}, {}, {})",
                rect.x, rect.y, rect.width, rect.height
            );
            out.push('\n');
            ids.push(next_atlas);
            next_atlas += 1;
        }
        atlas_ids.push(ids);
    }

    out.push_str("[resource]\n");
    out.push_str("animations = [");
    for (i, (animation, ids)) in metadata.animations.iter().zip(&atlas_ids).enumerate() {
        if i > 0 {
            out.push_str(", ");
        }
        out.push_str("{\n\"frames\": [");
        for (j, id) in ids.iter().enumerate() {
            if j > 0 {
                out.push_str(", ");
            }
            let _ = write!(
                out,
                "{{\n\"duration\": 1.0,\n\"texture\": SubResource(\"AtlasTexture_{}\")\n}}",
                id
            );
        }
        let _ = write!(
            out,
            "],\n\"loop\": {},\n\"name\": &\"{}\",\n\"speed\": {:.1}\n}}",
            animation.looping,
            escape(&animation.name),
            animation.fps as f64
        );
    }
    out.push_str("]\n");
    out
}

/// Escapes text for use inside a quoted Godot string or `StringName`.
fn escape(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '\\' => escaped.push_str("\\\\"),
            '"' => escaped.push_str("\\\""),
            '\n' => escaped.push_str("\\n"),
            '\r' => escaped.push_str("\\r"),
            '\t' => escaped.push_str("\\t"),
            c => escaped.push(c),
        }
    }
    escaped
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metadata::NamedAnimation;
    use crate::sheet::FrameRect;

    fn rect(x: u32) -> FrameRect {
        FrameRect {
            x,
            y: 0,
            width: 16,
            height: 16,
        }
    }

    fn metadata() -> AnimationMetadata {
        let mut meta = AnimationMetadata::new("knight");
        for (clip, looping) in [("walk", true), ("die", false)] {
            meta.animations.push(NamedAnimation {
                name: format!("{clip}_default"),
                clip: clip.to_string(),
                direction: 0,
                direction_label: "default".to_string(),
                sheet: format!("knight_{clip}.png"),
                frames: vec![rect(0), rect(16)],
                frame_count: 2,
                looping,
                fps: 12,
            });
        }
        meta
    }

    #[test]
    fn test_header_counts_resources() {
        let tres = sprite_frames_tres(&metadata(), "res://sheets/");
        assert!(tres.starts_with("[gd_resource type=\"SpriteFrames\" load_steps=7 format=3]"));
    }

    #[test]
    fn test_textures_and_atlases() {
        let tres = sprite_frames_tres(&metadata(), "res://sheets/");
        assert!(tres.contains(
            "[ext_resource type=\"Texture2D\" path=\"res://sheets/knight_die.png\" id=\"1\"]"
        ));
        assert!(tres.contains(
            "[ext_resource type=\"Texture2D\" path=\"res://sheets/knight_walk.png\" id=\"2\"]"
        ));
        assert_eq!(tres.matches("type=\"AtlasTexture\"").count(), 4);
        assert!(tres.contains("region = Rect2(16, 0, 16, 16)"));
        // walk frames point at the second texture.
        assert!(tres.contains(
            "[sub_resource type=\"AtlasTexture\" id=\"AtlasTexture_1\"]\natlas = ExtResource(\"2\")"
        ));
    }

    #[test]
    fn test_animation_entries() {
        let tres = sprite_frames_tres(&metadata(), "res://sheets");
        assert!(tres.contains("\"name\": &\"walk_default\""));
        assert!(tres.contains("\"name\": &\"die_default\""));
        assert!(tres.contains("\"loop\": false"));
        assert!(tres.contains("\"speed\": 12.0"));
        assert!(tres.contains("SubResource(\"AtlasTexture_4\")"));
        assert!(tres.trim_end().ends_with("}]"));
    }

    #[test]
    fn test_names_and_paths_are_escaped() {
        let mut meta = metadata();
        meta.animations[0].name = "say \"hi\"_default".to_string();
        meta.animations[1].name = "a\\b\nc".to_string();
        let tres = sprite_frames_tres(&meta, "res://my \"art\"");

        assert!(tres.contains("\"name\": &\"say \\\"hi\\\"_default\","));
        assert!(tres.contains("\"name\": &\"a\\\\b\\nc\","));
        assert!(tres.contains("path=\"res://my \\\"art\\\"/knight_die.png\""));
        assert!(!tres.contains("a\\b\nc"));
    }
}
