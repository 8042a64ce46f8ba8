//! SCALE runtime metadata decoding.
//!
//! Turns the hex payload stored by the dictionary backend into the
//! pallet/call/event registry used for name resolution and rendering.

use scale_info::Variant;
use scale_info::form::PortableForm;
use subxt::Metadata;
use subxt::ext::codec::Decode;
use tracing::{instrument, trace};

use chainlens_core::error::{MetadataError, MetadataResult};
use chainlens_core::models::{ArgDef, DecodedMetadata, PalletDef, VariantDef};
use chainlens_core::ports::MetadataDecoder;

/// Decodes `RuntimeMetadataPrefixed` payloads with subxt.
#[derive(Debug, Clone, Copy, Default)]
pub struct ScaleMetadataDecoder;

impl MetadataDecoder for ScaleMetadataDecoder {
    #[instrument(skip_all, fields(len = hex.len()))]
    fn decode(&self, hex: &str) -> MetadataResult<DecodedMetadata> {
        let bytes = hex::decode(hex.strip_prefix("0x").unwrap_or(hex))
            .map_err(|e| MetadataError::Hex(e.to_string()))?;
        let metadata = decode_metadata(&bytes)?;
        let registry = to_registry(&metadata);
        trace!(pallets = registry.pallets.len(), "Decoded runtime metadata");
        Ok(registry)
    }
}

/// Decode raw metadata, accepting both the bare prefixed form returned by
/// `state_getMetadata` and the length-prefixed `OpaqueMetadata` form.
fn decode_metadata(bytes: &[u8]) -> MetadataResult<Metadata> {
    match Metadata::decode(&mut &bytes[..]) {
        Ok(metadata) => Ok(metadata),
        Err(direct) => {
            let inner = Vec::<u8>::decode(&mut &bytes[..])
                .map_err(|_| MetadataError::Scale(direct.to_string()))?;
            Metadata::decode(&mut &inner[..]).map_err(|e| MetadataError::Scale(e.to_string()))
        }
    }
}

fn to_registry(metadata: &Metadata) -> DecodedMetadata {
    let pallets = metadata
        .pallets()
        .map(|pallet| PalletDef {
            name: pallet.name().to_string(),
            calls: pallet.call_variants().map(variants).unwrap_or_default(),
            events: pallet.event_variants().map(variants).unwrap_or_default(),
        })
        .collect();

    DecodedMetadata { pallets }
}

fn variants(defs: &[Variant<PortableForm>]) -> Vec<VariantDef> {
    defs.iter()
        .map(|v| VariantDef {
            name: v.name.clone(),
            args: v
                .fields
                .iter()
                .map(|f| ArgDef {
                    name: f.name.clone(),
                    type_name: f.type_name.clone(),
                })
                .collect(),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use scale_info::Field;

    use super::*;

    #[test]
    fn variants_keep_names_and_args() {
        let transfer = Variant::<PortableForm> {
            name: "transfer_keep_alive".into(),
            fields: vec![
                Field {
                    name: Some("dest".into()),
                    ty: 0u32.into(),
                    type_name: Some("AccountIdLookupOf<T>".into()),
                    docs: vec![],
                },
                Field {
                    name: None,
                    ty: 1u32.into(),
                    type_name: None,
                    docs: vec![],
                },
            ],
            index: 3,
            docs: vec![],
        };

        let defs = variants(&[transfer]);

        assert_eq!(defs.len(), 1);
        assert_eq!(defs[0].name, "transfer_keep_alive");
        assert_eq!(defs[0].args.len(), 2);
        assert_eq!(defs[0].args[0].name.as_deref(), Some("dest"));
        assert_eq!(defs[0].args[0].type_name.as_deref(), Some("AccountIdLookupOf<T>"));
        assert!(defs[0].args[1].name.is_none());
    }

    #[test]
    fn rejects_invalid_hex() {
        let err = ScaleMetadataDecoder.decode("0xzz").unwrap_err();
        assert!(matches!(err, MetadataError::Hex(_)));
    }

    #[test]
    fn rejects_non_metadata_payload() {
        let err = ScaleMetadataDecoder.decode("0x6d657461").unwrap_err();
        assert!(matches!(err, MetadataError::Scale(_)));

        let err = ScaleMetadataDecoder.decode("").unwrap_err();
        assert!(matches!(err, MetadataError::Scale(_)));
    }
}
