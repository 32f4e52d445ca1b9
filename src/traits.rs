use std::borrow::Cow;

use crate::types::Record;

/// Anything that can present itself as a [`Record`] for ACL synthesis, e.g. a
/// domain struct that knows its own type tag and field values.
pub trait AclObject {
    /// The record view of this object. [`Record`] itself borrows.
    fn acl_record(&self) -> Cow<'_, Record>;

    /// The type tag used to look up schema metadata. Override it when the
    /// record view is expensive to build.
    fn acl_type(&self) -> Cow<'_, str> {
        Cow::Owned(self.acl_record().type_tag().to_string())
    }
}

impl AclObject for Record {
    fn acl_record(&self) -> Cow<'_, Record> {
        Cow::Borrowed(self)
    }

    fn acl_type(&self) -> Cow<'_, str> {
        Cow::Borrowed(self.type_tag())
    }
}

impl<T: AclObject + ?Sized> AclObject for &T {
    fn acl_record(&self) -> Cow<'_, Record> {
        (**self).acl_record()
    }

    fn acl_type(&self) -> Cow<'_, str> {
        (**self).acl_type()
    }
}
