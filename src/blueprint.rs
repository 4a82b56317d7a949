use anyhow::{anyhow, Context, Result};
use glam::Vec2;
use roxmltree::{Document, Node};
use serde::{Deserialize, Serialize};

use crate::body::{AppendageKind, BodyTree, PartKind, WeaponKind};

/// Body definition as described by the authoring tools.
///
/// A document holds a single `<body>` element with one root `<part>`;
/// parts nest to describe the articulation hierarchy:
///
/// ```xml
/// <body>
///   <part kind="body" size="4" defense="2">
///     <part kind="appendage" subtype="leg" position="0.5 0" size="2"/>
///     <part kind="weapon" subtype="sword" position="1 0" size="2"/>
///   </part>
/// </body>
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BodyBlueprint {
    pub root: PartBlueprint,
}

/// One `<part>` element: the data needed to attach a node at assembly time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PartBlueprint {
    pub kind: PartKind,
    pub position: Vec2,
    pub size: f32,
    pub defense: f32,
    pub children: Vec<PartBlueprint>,
}

const DEFAULT_SIZE: f32 = 4.0;
const DEFAULT_DEFENSE: f32 = 1.0;

impl BodyBlueprint {
    /// Parses the body XML produced by the authoring tools.
    pub fn from_xml(xml: &str) -> Result<Self> {
        let document = Document::parse(xml).context("invalid body XML")?;
        let body = document
            .descendants()
            .find(|n| n.has_tag_name("body"))
            .ok_or_else(|| anyhow!("<body> element is missing"))?;
        let mut parts = body.children().filter(|n| n.has_tag_name("part"));
        let root = parts
            .next()
            .ok_or_else(|| anyhow!("<body> must contain a root <part>"))?;
        if parts.next().is_some() {
            return Err(anyhow!("<body> must contain exactly one root <part>"));
        }
        Ok(Self {
            root: parse_part(&root)?,
        })
    }

    /// Builds the runtime tree, validating every part on the way.
    pub fn assemble(&self) -> Result<BodyTree> {
        let mut tree = BodyTree::with_root(
            self.root.position,
            self.root.size,
            self.root.kind,
            self.root.defense,
        )
        .context("invalid root part")?;
        let root = tree.root();
        for child in &self.root.children {
            attach_part(&mut tree, root, child)?;
        }
        Ok(tree)
    }
}

fn attach_part(
    tree: &mut BodyTree,
    parent: crate::body::NodeId,
    blueprint: &PartBlueprint,
) -> Result<()> {
    let id = tree
        .attach(
            parent,
            blueprint.position,
            blueprint.size,
            blueprint.kind,
            blueprint.defense,
        )
        .with_context(|| format!("invalid {:?} part", blueprint.kind))?;
    for child in &blueprint.children {
        attach_part(tree, id, child)?;
    }
    Ok(())
}

fn parse_part(node: &Node<'_, '_>) -> Result<PartBlueprint> {
    let kind = parse_kind(
        &required_attr(node, "kind")?,
        optional_attr(node, "subtype").as_deref(),
    )?;
    let position = parse_vec2(optional_attr(node, "position"), Vec2::ZERO)?;
    let size = parse_f32(optional_attr(node, "size"), DEFAULT_SIZE)?;
    let defense = parse_f32(optional_attr(node, "defense"), DEFAULT_DEFENSE)?;

    let mut children = Vec::new();
    for child in node.children().filter(|n| n.has_tag_name("part")) {
        children.push(parse_part(&child)?);
    }

    Ok(PartBlueprint {
        kind,
        position,
        size,
        defense,
        children,
    })
}

fn parse_kind(kind: &str, subtype: Option<&str>) -> Result<PartKind> {
    match kind {
        "body" => match subtype {
            None => Ok(PartKind::Body),
            Some(other) => Err(anyhow!("body parts take no subtype, got \"{other}\"")),
        },
        "weapon" => match subtype {
            None | Some("sword") => Ok(PartKind::Weapon(WeaponKind::Sword)),
            Some("gun") => Ok(PartKind::Weapon(WeaponKind::Gun)),
            Some(other) => Err(anyhow!("unknown weapon subtype \"{other}\"")),
        },
        "appendage" => match subtype {
            None | Some("leg") => Ok(PartKind::Appendage(AppendageKind::Leg)),
            Some(other) => Err(anyhow!("unknown appendage subtype \"{other}\"")),
        },
        other => Err(anyhow!("unknown part kind \"{other}\"")),
    }
}

fn required_attr(node: &Node<'_, '_>, name: &str) -> Result<String> {
    optional_attr(node, name).ok_or_else(|| anyhow!("\"{name}\" attribute is missing"))
}

fn optional_attr(node: &Node<'_, '_>, name: &str) -> Option<String> {
    node.attribute(name)
        .map(str::trim)
        .filter(|text| !text.is_empty())
        .map(|text| text.to_string())
}

fn parse_vec2(value: Option<String>, default: Vec2) -> Result<Vec2> {
    let Some(value) = value else {
        return Ok(default);
    };
    let mut numbers = value
        .split_whitespace()
        .map(|component| component.parse::<f32>());
    let x = numbers
        .next()
        .ok_or_else(|| anyhow!("position is missing components"))?
        .context("invalid position component")?;
    let z = numbers
        .next()
        .ok_or_else(|| anyhow!("position is missing components"))?
        .context("invalid position component")?;
    Ok(Vec2::new(x, z))
}

fn parse_f32(value: Option<String>, default: f32) -> Result<f32> {
    match value {
        Some(value) => value
            .parse::<f32>()
            .map_err(|err| anyhow!("failed to parse float: {err}")),
        None => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"
    <body>
        <part kind="body" size="4" defense="2">
            <part kind="appendage" position="0.5 0" size="2"/>
            <part kind="weapon" subtype="gun" position="1 0" size="8"/>
        </part>
    </body>
    "#;

    #[test]
    fn parses_nested_parts_with_defaults() {
        let blueprint = BodyBlueprint::from_xml(SAMPLE).unwrap();
        assert_eq!(blueprint.root.kind, PartKind::Body);
        assert_eq!(blueprint.root.defense, 2.0);
        assert_eq!(blueprint.root.children.len(), 2);
        let leg = &blueprint.root.children[0];
        assert_eq!(leg.kind, PartKind::Appendage(AppendageKind::Leg));
        assert_eq!(leg.position, Vec2::new(0.5, 0.0));
        assert_eq!(leg.defense, 1.0);
        let gun = &blueprint.root.children[1];
        assert_eq!(gun.kind, PartKind::Weapon(WeaponKind::Gun));
        assert_eq!(gun.size, 8.0);
    }

    #[test]
    fn assembles_into_a_tree() {
        let tree = BodyBlueprint::from_xml(SAMPLE).unwrap().assemble().unwrap();
        assert_eq!(tree.len(), 3);
        assert_eq!(tree.get(tree.root()).unwrap().kind, PartKind::Body);
    }

    #[test]
    fn missing_kind_is_an_error() {
        let bad = "<body><part size=\"4\"/></body>";
        assert!(BodyBlueprint::from_xml(bad).is_err());
    }

    #[test]
    fn unknown_kind_is_an_error() {
        let bad = "<body><part kind=\"tentacle\"/></body>";
        let err = BodyBlueprint::from_xml(bad).unwrap_err();
        assert!(err.to_string().contains("tentacle"));
    }

    #[test]
    fn subtype_must_match_the_kind() {
        let bad = "<body><part kind=\"body\" subtype=\"sword\"/></body>";
        assert!(BodyBlueprint::from_xml(bad).is_err());
        let bad = "<body><part kind=\"weapon\" subtype=\"leg\"/></body>";
        assert!(BodyBlueprint::from_xml(bad).is_err());
    }

    #[test]
    fn multiple_roots_are_rejected() {
        let bad = "<body><part kind=\"body\"/><part kind=\"body\"/></body>";
        assert!(BodyBlueprint::from_xml(bad).is_err());
    }

    #[test]
    fn invalid_defense_surfaces_at_assembly() {
        let xml = "<body><part kind=\"body\" defense=\"0\"/></body>";
        let blueprint = BodyBlueprint::from_xml(xml).unwrap();
        let err = blueprint.assemble().unwrap_err();
        assert!(format!("{err:#}").contains("defense"));
    }
}
