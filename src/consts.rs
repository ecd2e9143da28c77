// Marker annotations recognized on platform-expected methods

/// Runtime-visible marker; resolves through the fixed legacy resolver
pub const EXPECT_PLATFORM_LEGACY: &str = "Lme/shedaniel/architectury/ExpectPlatform;";
/// Class-retained (invisible) marker; resolves through the build's own namespace
pub const EXPECT_PLATFORM_NEW: &str = "Lme/shedaniel/architectury/annotations/ExpectPlatform;";

// Resolver classes and their bootstrap method
pub const LEGACY_PLATFORM_METHODS: &str = "me/shedaniel/architectury/PlatformMethods";
pub const PLATFORM_METHODS_SIMPLE_NAME: &str = "PlatformMethods";
pub const BOOTSTRAP_METHOD_NAME: &str = "platform";
pub const BOOTSTRAP_METHOD_DESCRIPTOR: &str =
    "(Ljava/lang/invoke/MethodHandles$Lookup;Ljava/lang/String;Ljava/lang/invoke/MethodType;)Ljava/lang/invoke/CallSite;";

// Support classes shipped in the embedded archive live under this package
pub const INJECTABLES_PLACEHOLDER: &str = "me/shedaniel/architect/plugin/callsite";

// Build identifiers look like `architectury_inject_<project>_<uuid>`
pub const IDENTIFIER_PREFIX: &str = "architectury_inject_";
pub const DEFAULT_PROJECT_NAME: &str = "project";

pub const USAGE_ERROR_STATIC_ONLY: &str = "@ExpectPlatform can only apply to static methods!";

// Environment overrides
pub const ENV_UNIQUE_IDENTIFIER: &str = "EXPECT_PLATFORM_UNIQUE_IDENTIFIER";
pub const ENV_INJECT: &str = "EXPECT_PLATFORM_INJECT";
pub const ENV_PROJECT: &str = "EXPECT_PLATFORM_PROJECT";

pub const CLASS_FILE_SUFFIX: &str = ".class";
