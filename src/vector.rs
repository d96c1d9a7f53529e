use crate::err::Result;
use crate::tag::Tag;
use crate::template::Template;
use crate::utils::{hex_out, hexdump};

use serde::ser::SerializeMap;
use serde::{Serialize, Serializer};
use std::io::{self, Write};

/// One concrete combination of a template: a value for every referenced field tag.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VectorSet {
    /// Number of the block the combination came from.
    pub vector: u64,
    /// Position of the combination within its block, starting at zero.
    pub combination: u64,
    pub generate: bool,
    #[serde(serialize_with = "serialize_fields")]
    pub fields: Vec<(Tag, Vec<u8>)>,
}

impl VectorSet {
    /// Captures the template's current combination, in declaration order.
    ///
    /// Context-copy fields take their bytes from `context`.
    pub fn capture(
        template: &mut Template,
        vector: u64,
        combination: u64,
        context: &[u8],
    ) -> Result<Self> {
        let order = template.tag_order().to_vec();
        let mut fields = Vec::with_capacity(order.len());

        for tag in order {
            let value = template.record_mut(tag)?.get_value_from(context).to_vec();
            fields.push((tag, value));
        }

        Ok(VectorSet {
            vector,
            combination,
            generate: template.is_generator(),
            fields,
        })
    }

    pub fn get(&self, tag: Tag) -> Option<&[u8]> {
        self.fields
            .iter()
            .find(|(t, _)| *t == tag)
            .map(|(_, value)| value.as_slice())
    }

    /// Writes the combination back in template syntax, one `VEC` line followed by the fields.
    ///
    /// Generation requests keep their `GEN` line.
    pub fn write_text<W: Write>(&self, out: &mut W) -> io::Result<()> {
        writeln!(out, "VEC {}", self.vector)?;
        if self.generate {
            writeln!(out, "{}", Tag::Gen)?;
        }
        for (tag, value) in &self.fields {
            hex_out(out, tag.name(), value)?;
        }
        Ok(())
    }

    /// Writes every field as a canonical hexdump.
    pub fn write_hexdump<W: Write>(&self, out: &mut W) -> io::Result<()> {
        writeln!(out, "VEC {} (combination {})", self.vector, self.combination)?;
        for (tag, value) in &self.fields {
            writeln!(out, "{} ({} bytes)", tag, value.len())?;
            out.write_all(hexdump(value, 0).as_bytes())?;
        }
        Ok(())
    }
}

fn serialize_fields<S: Serializer>(
    fields: &[(Tag, Vec<u8>)],
    serializer: S,
) -> std::result::Result<S::Ok, S::Error> {
    let mut map = serializer.serialize_map(Some(fields.len()))?;
    for (tag, value) in fields {
        map.serialize_entry(tag, &hex::encode(value))?;
    }
    map.end()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn vector() -> VectorSet {
        VectorSet {
            vector: 7,
            combination: 1,
            generate: false,
            fields: vec![(Tag::Key, vec![0x00, 0x01]), (Tag::Ptx, vec![])],
        }
    }

    #[test]
    fn test_capture_follows_declaration_order() {
        let mut t = Template::new();
        for line in ["PTX 0a0b", "KEY 01", "CTX @"] {
            let tag = t.set_tag(line);
            t.register_tag(tag).unwrap();
        }
        assert!(t.next());

        let v = VectorSet::capture(&mut t, 3, 0, &[0xff, 0xee]).unwrap();
        assert_eq!(
            v.fields,
            vec![
                (Tag::Ptx, vec![0x0a, 0x0b]),
                (Tag::Key, vec![0x01]),
                (Tag::Ctx, vec![0xff, 0xee]),
            ]
        );
        assert_eq!(v.get(Tag::Ctx), Some(&[0xff, 0xee][..]));
        assert_eq!(v.get(Tag::Tag), None);
    }

    #[test]
    fn test_text_output() {
        let mut out = Vec::new();
        vector().write_text(&mut out).unwrap();
        assert_eq!(String::from_utf8(out).unwrap(), "VEC 7\nKEY 0001\nPTX\n");
    }

    #[test]
    fn test_text_output_keeps_generation_marker() {
        let mut v = vector();
        v.generate = true;

        let mut out = Vec::new();
        v.write_text(&mut out).unwrap();
        assert_eq!(String::from_utf8(out).unwrap(), "VEC 7\nGEN\nKEY 0001\nPTX\n");
    }

    #[test]
    fn test_json_output() {
        let json = serde_json::to_string(&vector()).unwrap();
        assert_eq!(
            json,
            r#"{"vector":7,"combination":1,"generate":false,"fields":{"KEY":"0001","PTX":""}}"#
        );
    }

    #[test]
    fn test_hexdump_output() {
        let mut out = Vec::new();
        vector().write_hexdump(&mut out).unwrap();
        let text = String::from_utf8(out).unwrap();
        assert!(text.starts_with("VEC 7 (combination 1)\nKEY (2 bytes)\n00000000: 00 01"));
        assert!(text.ends_with("PTX (0 bytes)\n"));
    }
}
