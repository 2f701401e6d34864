use crate::base_writer::{ItemWriter, WriterOptions};
use crate::items::Item;
use crate::types::Result;
use std::io::Write;
use std::marker::PhantomData;

/// JSON writer: one self-describing object per item, one item per line.
pub struct JsonWriter<T, W: Write> {
    out: W,
    _item: PhantomData<fn(&T)>,
}

impl<T: Item, W: Write> JsonWriter<T, W> {
    pub fn new(out: W, options: &WriterOptions) -> Result<Self> {
        options.time_field::<T>()?;
        Ok(Self { out, _item: PhantomData })
    }

    pub fn into_inner(self) -> W {
        self.out
    }
}

impl<T: Item, W: Write> ItemWriter<T> for JsonWriter<T, W> {
    fn name(&self) -> &'static str {
        "json"
    }

    fn write_item(&mut self, item: &T) -> Result<()> {
        serde_json::to_writer(&mut self.out, item)?;
        self.out.write_all(b"\n")?;
        Ok(())
    }

    fn write_footer(&mut self) -> Result<()> {
        self.out.flush()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::base_writer::write_items;
    use crate::items::MirrorItem;

    #[test]
    fn test_json_lines() {
        let mut writer = JsonWriter::<MirrorItem, _>::new(Vec::new(), &WriterOptions::default()).unwrap();
        let items = vec![
            Ok(MirrorItem { timestamp: 10, host: "a".into(), repo_tag: Some("r".into()), repo_arch: None }),
            Ok(MirrorItem { timestamp: 11, host: "b".into(), repo_tag: None, repo_arch: Some("x".into()) }),
        ];
        write_items(&mut writer, items).unwrap();
        let out = String::from_utf8(writer.into_inner()).unwrap();
        assert_eq!(
            out,
            concat!(
                r#"{"timestamp":10,"host":"a","repo_tag":"r","repo_arch":null}"#,
                "\n",
                r#"{"timestamp":11,"host":"b","repo_tag":null,"repo_arch":"x"}"#,
                "\n",
            )
        );
    }
}
