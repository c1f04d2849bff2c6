pub mod primitive;
pub mod type_ref;

// Re-export common types
pub use primitive::PrimitiveKind;
pub use type_ref::TypeRef;

/// Unit names derived from an owner type, shared by every sink.
pub mod units {
    use super::TypeRef;

    /// Package used for generated units when none is configured.
    pub const DEFAULT_PACKAGE: &str = "comet";

    /// `com.example.Stream` → `com_example_Stream`
    pub fn mangle(owner: &TypeRef) -> String {
        owner.name().replace(['.', '$'], "_")
    }

    pub fn class_name(owner: &TypeRef) -> String {
        format!("{}Impl", mangle(owner))
    }

    pub fn serializer_name(package: &str, owner: &TypeRef) -> String {
        format!("{}.{}Serializer", package, mangle(owner))
    }

    /// Name of the private closure log resource for `owner`.
    pub fn log_resource(owner: &TypeRef) -> String {
        format!("{}.rpc.log", owner.name())
    }

    /// Name of the field manifest committed under `NamedFieldManifest`.
    pub fn manifest_resource(owner: &TypeRef) -> String {
        format!("{}.rpcdata.json", owner.source_name())
    }

    #[cfg(test)]
    mod tests {
        use super::*;

        #[test]
        fn test_unit_names() {
            let owner = TypeRef::named("com.example.Chat$Stream");
            assert_eq!(class_name(&owner), "com_example_Chat_StreamImpl");
            assert_eq!(
                serializer_name("comet", &owner),
                "comet.com_example_Chat_StreamSerializer"
            );
            assert_eq!(log_resource(&owner), "com.example.Chat$Stream.rpc.log");
            assert_eq!(
                manifest_resource(&owner),
                "com.example.Chat.Stream.rpcdata.json"
            );
        }
    }
}
