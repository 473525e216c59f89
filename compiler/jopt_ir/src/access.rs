//! Access flags for classes, methods, and fields.
//!
//! Bit values match the class file format so a loader can copy them through
//! unchanged.

use bitflags::bitflags;

bitflags! {
    /// Class access and property flags.
    #[derive(Copy, Clone, Eq, PartialEq, Hash, Debug, Default)]
    #[cfg_attr(feature = "cache", derive(serde::Serialize, serde::Deserialize))]
    pub struct ClassAccess: u16 {
        const PUBLIC = 0x0001;
        const FINAL = 0x0010;
        const SUPER = 0x0020;
        const INTERFACE = 0x0200;
        const ABSTRACT = 0x0400;
        const SYNTHETIC = 0x1000;
        const ANNOTATION = 0x2000;
        const ENUM = 0x4000;
    }
}

bitflags! {
    /// Method access and property flags.
    #[derive(Copy, Clone, Eq, PartialEq, Hash, Debug, Default)]
    #[cfg_attr(feature = "cache", derive(serde::Serialize, serde::Deserialize))]
    pub struct MethodAccess: u16 {
        const PUBLIC = 0x0001;
        const PRIVATE = 0x0002;
        const PROTECTED = 0x0004;
        const STATIC = 0x0008;
        const FINAL = 0x0010;
        const SYNCHRONIZED = 0x0020;
        const BRIDGE = 0x0040;
        const VARARGS = 0x0080;
        const NATIVE = 0x0100;
        const ABSTRACT = 0x0400;
        const STRICT = 0x0800;
        const SYNTHETIC = 0x1000;
    }
}

bitflags! {
    /// Field access and property flags.
    #[derive(Copy, Clone, Eq, PartialEq, Hash, Debug, Default)]
    #[cfg_attr(feature = "cache", derive(serde::Serialize, serde::Deserialize))]
    pub struct FieldAccess: u16 {
        const PUBLIC = 0x0001;
        const PRIVATE = 0x0002;
        const PROTECTED = 0x0004;
        const STATIC = 0x0008;
        const FINAL = 0x0010;
        const VOLATILE = 0x0040;
        const TRANSIENT = 0x0080;
        const SYNTHETIC = 0x1000;
        const ENUM = 0x4000;
    }
}

/// Member visibility, from most to least restrictive.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Visibility {
    Private,
    /// No visibility flag: accessible within the package only.
    Package,
    /// Accessible within the package and from subclasses.
    Protected,
    Public,
}

impl Visibility {
    /// Whether code in another class of the same package can see the member.
    ///
    /// Protected members count: the JVM grants package access to them too.
    #[inline]
    pub fn is_package_visible(self) -> bool {
        matches!(self, Visibility::Package | Visibility::Protected)
    }
}

impl ClassAccess {
    /// Classes are either public or package-private.
    #[inline]
    pub fn visibility(self) -> Visibility {
        if self.contains(Self::PUBLIC) {
            Visibility::Public
        } else {
            Visibility::Package
        }
    }
}

impl MethodAccess {
    #[inline]
    pub fn visibility(self) -> Visibility {
        visibility_of(
            self.contains(Self::PUBLIC),
            self.contains(Self::PROTECTED),
            self.contains(Self::PRIVATE),
        )
    }
}

impl FieldAccess {
    #[inline]
    pub fn visibility(self) -> Visibility {
        visibility_of(
            self.contains(Self::PUBLIC),
            self.contains(Self::PROTECTED),
            self.contains(Self::PRIVATE),
        )
    }
}

fn visibility_of(public: bool, protected: bool, private: bool) -> Visibility {
    if public {
        Visibility::Public
    } else if protected {
        Visibility::Protected
    } else if private {
        Visibility::Private
    } else {
        Visibility::Package
    }
}
