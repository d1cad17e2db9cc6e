mod util;

mod tests {
    use std::ffi::c_void;

    use abi_marshal::{
        native::string::{create_string, delete_string},
        prelude::*,
    };

    use super::util::{
        AbiNonBlittable, ArrayProperty, NonBlittable, Property, init_tracing, non_blittable, sample,
    };

    fn malformed() -> HString {
        create_string(&[0x66, 0xFF, 0x6F]).unwrap()
    }

    fn malformed_composite() -> AbiNonBlittable {
        let mut abi = Marshaler::<NonBlittable>::into_abi(&sample()).unwrap();
        assert!(unsafe { delete_string(abi.s2) }.is_ok());
        abi.s2 = malformed();
        abi
    }

    fn malformed_array() -> ArrayAbi<HString> {
        let abi = Marshaler::<String>::into_abi_array(&[String::from("ok"), String::from("x")]).unwrap();
        unsafe {
            let last = abi.data.add(1);
            assert!(delete_string(last.read()).is_ok());
            last.write(malformed());
        }
        abi
    }

    unsafe extern "C" fn read_malformed<A: Copy>(this: *mut c_void) -> A {
        let make = unsafe { *this.cast::<fn() -> A>() };
        make()
    }

    unsafe extern "C" fn ignore<A>(_: *mut c_void, _: A) {}

    unsafe extern "C" fn output_malformed<A: Copy>(this: *mut c_void, out: *mut A) {
        unsafe { out.write(read_malformed::<A>(this)) };
    }

    // The slot only holds a value owned by the caller's cache, it can be overwritten without
    // releasing it.
    unsafe extern "C" fn replace_malformed<A: Copy>(this: *mut c_void, value: *mut A) {
        unsafe { value.write(read_malformed::<A>(this)) };
    }

    fn malformed_shapes<A: Copy>() -> CallShapes<A> {
        CallShapes::new(
            read_malformed::<A>,
            ignore::<A>,
            output_malformed::<A>,
            replace_malformed::<A>,
        )
    }

    #[test]
    fn string_property() {
        init_tracing();
        let before = ResourceLedger::snapshot();
        let mut property = Property::new(String::from("initial"));
        let accessor = property.accessor();

        assert_eq!(accessor.get().unwrap(), "initial");
        accessor.put(&String::from("written")).unwrap();
        assert_eq!(accessor.out().unwrap(), "written");

        let mut value = String::from("by ref");
        accessor.by_ref(&mut value).unwrap();
        assert_eq!(value, "by ref");
        assert_eq!(accessor.get().unwrap(), "by ref");

        assert!(ResourceLedger::snapshot().same_live(&before));
    }

    #[test]
    fn by_ref_releases_replacement() {
        let before = ResourceLedger::snapshot();
        let mut property = Property::new(String::new());
        property.replacement = Some(String::from("replaced"));
        let accessor = property.accessor();

        let mut value = String::from("original");
        accessor.by_ref(&mut value).unwrap();
        assert_eq!(value, "replaced");
        assert_eq!(accessor.get().unwrap(), "original");

        assert!(ResourceLedger::snapshot().same_live(&before));
    }

    #[test]
    fn composite_property() {
        let before = ResourceLedger::snapshot();
        let mut property = Property::new(sample());
        property.replacement = Some(non_blittable(1, 2.0, "x", "y"));
        let accessor = property.accessor();

        assert_eq!(accessor.get().unwrap(), sample());
        accessor.put(&non_blittable(7, 8.0, "put", "value")).unwrap();
        assert_eq!(accessor.out().unwrap(), non_blittable(7, 8.0, "put", "value"));

        let mut value = sample();
        accessor.by_ref(&mut value).unwrap();
        assert_eq!(value, non_blittable(1, 2.0, "x", "y"));

        assert!(ResourceLedger::snapshot().same_live(&before));
    }

    #[test]
    fn handle_property() {
        let mut target = 0u64;
        let handle = unsafe { ObjectHandle::from_raw(RawHandle((&mut target as *mut u64).cast())) };

        let mut property = Property::new(ObjectHandle::null());
        let accessor = property.accessor();

        accessor.put(&handle).unwrap();
        assert_eq!(accessor.get().unwrap(), handle);
        assert_eq!(accessor.out().unwrap(), handle);
    }

    #[test]
    fn array_properties() {
        let before = ResourceLedger::snapshot();

        let mut ints = ArrayProperty::new(vec![1i32, 2, 3]);
        ints.replacement = Some(vec![9]);
        let accessor = ints.accessor();
        assert_eq!(accessor.get().unwrap(), [1, 2, 3]);
        accessor.put(&[4, 5]).unwrap();
        assert_eq!(accessor.out().unwrap(), [4, 5]);
        let mut values = vec![6, 7, 8];
        accessor.by_ref(&mut values).unwrap();
        assert_eq!(values, [9]);
        assert_eq!(accessor.get().unwrap(), [6, 7, 8]);

        let mut composites = ArrayProperty::new(vec![sample(), sample()]);
        let accessor = composites.accessor();
        let written: Vec<NonBlittable> = vec![non_blittable(3, 3.5, "a", "b")];
        accessor.put(&written).unwrap();
        assert_eq!(accessor.get().unwrap(), written);
        assert_eq!(accessor.out().unwrap(), written);
        let mut values = vec![sample()];
        accessor.by_ref(&mut values).unwrap();
        assert_eq!(values, [sample()]);

        assert!(ResourceLedger::snapshot().same_live(&before));
    }

    #[test]
    fn raw_call_shapes_can_be_bound() {
        let shapes = Property::<u32>::shapes();
        let bound = unsafe {
            CallShapes::<u32>::from_raw(
                shapes.read as *const std::ffi::c_void,
                shapes.write as *const std::ffi::c_void,
                shapes.output as *const std::ffi::c_void,
                shapes.by_ref as *const std::ffi::c_void,
            )
        }
        .unwrap();

        let mut property = Property::new(5u32);
        let accessor = unsafe { Accessor::<u32>::new(property.this(), bound) }.unwrap();
        assert_eq!(accessor.get().unwrap(), 5);
        accessor.put(&6).unwrap();
        assert_eq!(accessor.out().unwrap(), 6);
    }

    #[test]
    fn failed_reads_release_the_returned_text() {
        init_tracing();
        let before = ResourceLedger::snapshot();
        let mut make: fn() -> HString = malformed;
        let this = (&mut make as *mut fn() -> HString).cast();
        let accessor = unsafe { Accessor::<String>::new(this, malformed_shapes()) }.unwrap();

        assert!(accessor.get().unwrap_err().is_conversion());
        assert!(accessor.out().unwrap_err().is_conversion());
        assert!(ResourceLedger::snapshot().same_live(&before));
    }

    #[test]
    fn failed_reads_release_partially_converted_composites() {
        let before = ResourceLedger::snapshot();
        let mut make: fn() -> AbiNonBlittable = malformed_composite;
        let this = (&mut make as *mut fn() -> AbiNonBlittable).cast();
        let accessor = unsafe { Accessor::<NonBlittable>::new(this, malformed_shapes()) }.unwrap();

        assert!(accessor.get().unwrap_err().is_conversion());
        assert!(accessor.out().unwrap_err().is_conversion());
        assert!(ResourceLedger::snapshot().same_live(&before));
    }

    #[test]
    fn failed_array_reads_release_every_element() {
        let before = ResourceLedger::snapshot();
        let mut make: fn() -> ArrayAbi<HString> = malformed_array;
        let this = (&mut make as *mut fn() -> ArrayAbi<HString>).cast();
        let accessor = unsafe { ArrayAccessor::<String>::new(this, malformed_shapes()) }.unwrap();

        assert!(accessor.get().unwrap_err().is_conversion());
        assert!(accessor.out().unwrap_err().is_conversion());
        assert!(ResourceLedger::snapshot().same_live(&before));
    }

    #[test]
    fn failed_by_ref_leaves_the_value_unchanged() {
        let before = ResourceLedger::snapshot();

        let mut make: fn() -> HString = malformed;
        let this = (&mut make as *mut fn() -> HString).cast();
        let accessor = unsafe { Accessor::<String>::new(this, malformed_shapes()) }.unwrap();
        let mut value = String::from("kept");
        assert!(accessor.by_ref(&mut value).unwrap_err().is_conversion());
        assert_eq!(value, "kept");

        let mut make: fn() -> AbiNonBlittable = malformed_composite;
        let this = (&mut make as *mut fn() -> AbiNonBlittable).cast();
        let accessor = unsafe { Accessor::<NonBlittable>::new(this, malformed_shapes()) }.unwrap();
        let mut value = non_blittable(1, 2.0, "kept", "too");
        assert!(accessor.by_ref(&mut value).unwrap_err().is_conversion());
        assert_eq!(value, non_blittable(1, 2.0, "kept", "too"));

        let mut make: fn() -> ArrayAbi<HString> = malformed_array;
        let this = (&mut make as *mut fn() -> ArrayAbi<HString>).cast();
        let accessor = unsafe { ArrayAccessor::<String>::new(this, malformed_shapes()) }.unwrap();
        let mut values = vec![String::from("kept")];
        assert!(accessor.by_ref(&mut values).unwrap_err().is_conversion());
        assert_eq!(values, ["kept"]);

        let after = ResourceLedger::snapshot();
        assert!(after.same_live(&before));
        assert!(after.pins_released > before.pins_released);
        assert!(after.string_references_released > before.string_references_released);
    }
}
