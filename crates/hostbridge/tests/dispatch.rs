use std::cmp::Ordering;
use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicUsize, Ordering as AtomicOrdering};

use hostbridge::{
    ArrayAccess, Arguments, Castable, Class, ClassHandle, Comparable, Countable, Destructible, FromValue, Invokable,
    MagicCall, MagicProperties, MagicStaticCall, Modifier, NativeError, NativeResult, Parameters,
};
use hostbridge_runtime::executor;
use hostbridge_runtime::{ArrayKey, CastType, ClassRef, Engine, ErrorLevel, HostError, Scalar, Value};

// ============================================================================
// Native types
// ============================================================================

#[derive(Debug, Default, Clone)]
struct Counter {
    value: i64,
}

impl Counter {
    fn increment(&mut self, params: &Parameters) -> NativeResult<i64> {
        self.value += params.arg_or::<i64>(0, 1)?;
        Ok(self.value)
    }

    fn current(&mut self, _params: &Parameters) -> NativeResult<i64> {
        Ok(self.value)
    }
}

fn counter_value(counter: &Counter) -> i64 {
    counter.value
}

fn set_counter_value(counter: &mut Counter, value: i64) {
    counter.value = value;
}

impl Countable for Counter {
    fn count(&mut self) -> NativeResult<i64> {
        Ok(self.value)
    }
}

impl Comparable for Counter {
    fn compare(&self, other: &Self) -> NativeResult<Ordering> {
        Ok(self.value.cmp(&other.value))
    }
}

/// Register a class, returning its handle and host record
fn install<T: 'static>(engine: &Engine, class: Class<T>) -> (ClassHandle, ClassRef) {
    let handle = class.build();
    let entry = handle.initialize(engine, "").unwrap();
    (handle, entry)
}

fn counter_class(name: &str) -> Class<Counter> {
    Class::<Counter>::new(name)
        .method("increment", Counter::increment, Modifier::PUBLIC, Arguments::new())
        .method("current", Counter::current, Modifier::PUBLIC, Arguments::new())
}

#[derive(Debug, Default)]
struct Settings {
    options: HashMap<String, i64>,
}

impl MagicProperties for Settings {
    fn magic_get(&mut self, name: &str) -> NativeResult<Value> {
        match self.options.get(name) {
            Some(value) => Ok(Value::Long(*value)),
            None => Err(NativeError::NotImplemented),
        }
    }

    fn magic_set(&mut self, name: &str, value: Value) -> NativeResult<()> {
        if !name.starts_with("opt_") {
            return Err(NativeError::NotImplemented);
        }
        self.options.insert(name.to_string(), i64::from_value(&value)?);
        Ok(())
    }

    fn magic_isset(&mut self, name: &str) -> NativeResult<bool> {
        if !name.starts_with("opt_") {
            return Err(NativeError::NotImplemented);
        }
        Ok(self.options.contains_key(name))
    }

    fn magic_unset(&mut self, name: &str) -> NativeResult<()> {
        if !name.starts_with("opt_") {
            return Err(NativeError::NotImplemented);
        }
        self.options.remove(name);
        Ok(())
    }
}

#[derive(Debug, Default)]
struct Shadow;

impl MagicProperties for Shadow {
    fn magic_get(&mut self, name: &str) -> NativeResult<Value> {
        match name {
            "shade" => Ok(Value::Null),
            _ => Err(NativeError::NotImplemented),
        }
    }

    fn magic_isset(&mut self, name: &str) -> NativeResult<bool> {
        match name {
            "shade" => Ok(true),
            _ => Err(NativeError::NotImplemented),
        }
    }
}

#[derive(Debug, Default)]
struct Slots {
    slots: BTreeMap<i64, i64>,
}

impl ArrayAccess for Slots {
    fn offset_exists(&mut self, offset: &Value) -> NativeResult<bool> {
        Ok(self.slots.contains_key(&i64::from_value(offset)?))
    }

    fn offset_get(&mut self, offset: &Value) -> NativeResult<Value> {
        let key = i64::from_value(offset)?;
        Ok(self.slots.get(&key).map_or(Value::Null, |v| Value::Long(*v)))
    }

    fn offset_set(&mut self, offset: Option<&Value>, value: Value) -> NativeResult<()> {
        let key = match offset {
            Some(offset) => i64::from_value(offset)?,
            None => self.slots.keys().next_back().map_or(0, |last| last + 1),
        };
        self.slots.insert(key, i64::from_value(&value)?);
        Ok(())
    }

    fn offset_unset(&mut self, offset: &Value) -> NativeResult<()> {
        self.slots.remove(&i64::from_value(offset)?);
        Ok(())
    }
}

#[derive(Debug, Default)]
struct Proxy {
    forwarded: Vec<(String, usize)>,
}

impl Proxy {
    fn forwarded(&mut self, _params: &Parameters) -> NativeResult<i64> {
        Ok(self.forwarded.len() as i64)
    }
}

impl MagicCall for Proxy {
    fn magic_call(&mut self, name: &str, params: &Parameters) -> NativeResult<Value> {
        if name == "missing" {
            return Err(NativeError::NotImplemented);
        }
        if name == "explode" {
            return Err(NativeError::runtime("boom"));
        }
        self.forwarded.push((name.to_string(), params.len()));
        Ok(Value::string(format!("{}:{}", name, params.len())))
    }
}

impl MagicStaticCall for Proxy {
    fn magic_call_static(name: &str, params: &Parameters) -> NativeResult<Value> {
        Ok(Value::string(format!("static {}:{}", name, params.len())))
    }
}

impl Invokable for Proxy {
    fn invoke(&mut self, params: &Parameters) -> NativeResult<Value> {
        let sum: i64 = (0..params.len())
            .map(|i| params.arg::<i64>(i))
            .sum::<NativeResult<i64>>()?;
        Ok(Value::Long(sum))
    }
}

#[derive(Debug, Default)]
struct Temperature {
    celsius: f64,
}

impl Castable for Temperature {
    fn cast_to_integer(&mut self) -> NativeResult<i64> {
        Ok(self.celsius.round() as i64)
    }

    fn cast_to_string(&mut self) -> NativeResult<String> {
        Ok(format!("{:.1}C", self.celsius))
    }
}

fn warm() -> Option<Temperature> {
    Some(Temperature { celsius: 21.6 })
}

// ============================================================================
// Methods
// ============================================================================

#[test]
fn test_method_table_has_sentinel() {
    let counter = counter_class("CounterTable").build();
    let entries = counter.method_entries();
    assert_eq!(entries.len(), 3);
    assert_eq!(entries[0].name.as_deref(), Some("increment"));
    assert_eq!(entries[1].name.as_deref(), Some("current"));
    assert!(entries[2].is_sentinel());
}

#[test]
fn test_declared_methods_run_on_native_instance() {
    let engine = Engine::new();
    let counter = counter_class("Counter").build();
    let class = counter.initialize(&engine, "").unwrap();

    let object = engine.new_object(&class).unwrap();
    assert_eq!(engine.call_method(&object, "increment", vec![]).unwrap(), Value::Long(1));
    assert_eq!(
        engine.call_method(&object, "INCREMENT", vec![Value::Long(5)]).unwrap(),
        Value::Long(6)
    );
    assert_eq!(engine.call_method(&object, "current", vec![]).unwrap(), Value::Long(6));

    let other = engine.new_object(&class).unwrap();
    assert_eq!(engine.call_method(&other, "current", vec![]).unwrap(), Value::Long(0));
}

#[test]
fn test_argument_type_error_becomes_host_exception() {
    let engine = Engine::new();
    let (_meta, class) = install(&engine, counter_class("StrictCounter"));
    let object = engine.new_object(&class).unwrap();

    let err = engine
        .call_method(&object, "increment", vec![Value::string("many")])
        .unwrap_err();
    assert_eq!(err.as_exception().map(|e| e.class.as_str()), Some("TypeError"));
}

#[test]
fn test_uninstantiable_class_is_fatal() {
    let engine = Engine::new();
    let (_meta, class) = install(&engine, Class::<Counter>::uninstantiable("Handle"));
    let err = engine.new_object(&class).unwrap_err();
    assert_eq!(err, HostError::fatal("Unable to instantiate Handle"));
}

// ============================================================================
// Properties
// ============================================================================

#[test]
fn test_read_only_property_refuses_writes() {
    let engine = Engine::new();
    let (_meta, class) = install(
        &engine,
        counter_class("Gauge")
            .property("value", counter_value, None, Modifier::PUBLIC)
            .fixed_property("unit", "ms", Modifier::PUBLIC),
    );
    let object = engine.new_object(&class).unwrap();

    engine.call_method(&object, "increment", vec![Value::Long(4)]).unwrap();
    assert_eq!(engine.read_property(&object, "value").unwrap(), Value::Long(4));
    assert_eq!(engine.read_property(&object, "unit").unwrap(), Value::string("ms"));

    let err = engine.write_property(&object, "value", Value::Long(9)).unwrap_err();
    assert_eq!(err, HostError::fatal("Unable to write to read-only property value"));
    let err = engine.write_property(&object, "unit", Value::string("s")).unwrap_err();
    assert_eq!(err, HostError::fatal("Unable to write to read-only property unit"));
    assert_eq!(engine.read_property(&object, "value").unwrap(), Value::Long(4));
}

#[test]
fn test_explicit_property_cannot_be_unset() {
    let engine = Engine::new();
    let (_meta, class) = install(
        &engine,
        counter_class("Meter")
            .property("value", counter_value, Some(set_counter_value), Modifier::PUBLIC),
    );
    let object = engine.new_object(&class).unwrap();

    engine.write_property(&object, "value", Value::Long(12)).unwrap();
    assert_eq!(engine.call_method(&object, "current", vec![]).unwrap(), Value::Long(12));

    let err = engine.unset_property(&object, "value").unwrap_err();
    assert_eq!(err, HostError::fatal("Property value can not be unset"));
}

#[test]
fn test_explicit_property_checks() {
    let engine = Engine::new();
    let (_meta, class) = install(
        &engine,
        counter_class("Inspected")
            .property("value", counter_value, Some(set_counter_value), Modifier::PUBLIC),
    );
    let object = engine.new_object(&class).unwrap();

    assert!(engine.property_exists(&object, "value").unwrap());
    assert!(engine.isset_property(&object, "value").unwrap());
    assert!(engine.empty_property(&object, "value").unwrap());

    engine.write_property(&object, "value", Value::Long(3)).unwrap();
    assert!(!engine.empty_property(&object, "value").unwrap());
}

#[test]
fn test_null_properties_are_not_set() {
    let engine = Engine::new();
    let (_meta, class) = install(
        &engine,
        counter_class("Nullable").fixed_property("n", Scalar::Null, Modifier::PUBLIC),
    );
    let object = engine.new_object(&class).unwrap();

    assert!(engine.property_exists(&object, "n").unwrap());
    assert!(!engine.isset_property(&object, "n").unwrap());
    assert!(engine.empty_property(&object, "n").unwrap());
    assert_eq!(engine.read_property(&object, "n").unwrap(), Value::Null);

    let (_meta, class) = install(&engine, Class::<Shadow>::new("Shadow").magic_properties());
    let object = engine.new_object(&class).unwrap();

    assert!(engine.property_exists(&object, "shade").unwrap());
    assert!(!engine.isset_property(&object, "shade").unwrap());
    assert!(engine.empty_property(&object, "shade").unwrap());
    assert_eq!(engine.read_property(&object, "shade").unwrap(), Value::Null);
}

#[test]
fn test_magic_properties_and_fallback() {
    executor::reset();
    let engine = Engine::new();
    let (_meta, class) = install(&engine, Class::<Settings>::new("Settings").magic_properties());
    let object = engine.new_object(&class).unwrap();

    engine.write_property(&object, "opt_level", Value::Long(3)).unwrap();
    engine.write_property(&object, "opt_zero", Value::Long(0)).unwrap();
    engine.write_property(&object, "plain", Value::Long(1)).unwrap();

    let table = object.properties().borrow().clone();
    assert!(table.get(&ArrayKey::from("opt_level")).is_none());
    assert_eq!(table.get(&ArrayKey::from("plain")), Some(&Value::Long(1)));

    assert_eq!(engine.read_property(&object, "opt_level").unwrap(), Value::Long(3));
    assert_eq!(engine.read_property(&object, "plain").unwrap(), Value::Long(1));

    assert!(engine.isset_property(&object, "opt_level").unwrap());
    assert!(engine.empty_property(&object, "opt_zero").unwrap());
    assert!(!engine.isset_property(&object, "opt_absent").unwrap());
    assert!(engine.isset_property(&object, "plain").unwrap());

    engine.unset_property(&object, "opt_level").unwrap();
    assert!(!engine.isset_property(&object, "opt_level").unwrap());

    assert_eq!(engine.read_property(&object, "nothing").unwrap(), Value::Null);
    let notices = executor::take_reported();
    assert!(notices
        .iter()
        .any(|e| e.level == ErrorLevel::Notice && e.message == "Undefined property: Settings::$nothing"));
}

// ============================================================================
// Dimensions and count
// ============================================================================

#[test]
fn test_array_access_dimensions() {
    let engine = Engine::new();
    let (_meta, class) = install(&engine, Class::<Slots>::new("Slots").array_access());
    let object = engine.new_object(&class).unwrap();

    engine.write_dimension(&object, Some(&Value::Long(1)), Value::Long(5)).unwrap();
    engine.write_dimension(&object, Some(&Value::string("2")), Value::Long(0)).unwrap();
    engine.write_dimension(&object, None, Value::Long(7)).unwrap();

    assert_eq!(engine.read_dimension(&object, &Value::Long(1)).unwrap(), Value::Long(5));
    assert_eq!(engine.read_dimension(&object, &Value::Long(3)).unwrap(), Value::Long(7));
    assert_eq!(engine.read_dimension(&object, &Value::Long(9)).unwrap(), Value::Null);

    engine.unset_dimension(&object, &Value::Long(3)).unwrap();
    assert!(!engine.isset_dimension(&object, &Value::Long(3)).unwrap());
}

#[test]
fn test_has_dimension_with_check_empty() {
    let engine = Engine::new();
    let (_meta, class) = install(&engine, Class::<Slots>::new("EmptySlots").array_access());
    let object = engine.new_object(&class).unwrap();
    engine.write_dimension(&object, Some(&Value::Long(1)), Value::Long(5)).unwrap();
    engine.write_dimension(&object, Some(&Value::Long(2)), Value::Long(0)).unwrap();

    assert!(engine.isset_dimension(&object, &Value::Long(1)).unwrap());
    assert!(engine.isset_dimension(&object, &Value::Long(2)).unwrap());
    assert!(!engine.isset_dimension(&object, &Value::Long(3)).unwrap());

    assert!(!engine.empty_dimension(&object, &Value::Long(1)).unwrap());
    assert!(engine.empty_dimension(&object, &Value::Long(2)).unwrap());
    assert!(engine.empty_dimension(&object, &Value::Long(3)).unwrap());
}

#[test]
fn test_dimensions_without_array_access_use_defaults() {
    let engine = Engine::new();
    let (_meta, class) = install(&engine, counter_class("PlainCounter"));
    let object = engine.new_object(&class).unwrap();

    assert_eq!(engine.read_dimension(&object, &Value::Long(0)).unwrap(), Value::Null);
    engine.write_dimension(&object, Some(&Value::Long(0)), Value::Long(1)).unwrap();
    assert!(!engine.isset_dimension(&object, &Value::Long(0)).unwrap());
    engine.unset_dimension(&object, &Value::Long(0)).unwrap();
}

#[test]
fn test_count() {
    executor::reset();
    let engine = Engine::new();
    let (_meta, countable) = install(&engine, counter_class("CountableCounter").countable());
    let object = engine.new_object(&countable).unwrap();
    engine.call_method(&object, "increment", vec![Value::Long(3)]).unwrap();
    assert_eq!(engine.count(&Value::Object(object)).unwrap(), 3);
    assert!(executor::take_reported().is_empty());

    let (_meta, plain) = install(&engine, counter_class("UncountableCounter"));
    let object = engine.new_object(&plain).unwrap();
    assert_eq!(engine.count(&Value::Object(object)).unwrap(), 1);
    let warnings = executor::take_reported();
    assert_eq!(warnings.len(), 1);
    assert_eq!(warnings[0].level, ErrorLevel::Warning);
}

// ============================================================================
// Magic calls
// ============================================================================

#[test]
fn test_magic_call_forwards_name_and_arguments() {
    let engine = Engine::new();
    let proxy = Class::<Proxy>::new("Proxy")
        .magic_call()
        .magic_call_static()
        .method("forwarded", Proxy::forwarded, Modifier::PUBLIC, Arguments::new())
        .build();
    let class = proxy.initialize(&engine, "").unwrap();
    let object = engine.new_object(&class).unwrap();

    let result = engine
        .call_method(&object, "frobnicate", vec![Value::Long(1), Value::Long(2)])
        .unwrap();
    assert_eq!(result, Value::string("frobnicate:2"));
    assert_eq!(engine.call_method(&object, "forwarded", vec![]).unwrap(), Value::Long(1));

    let result = engine.call_static(&class, "build", vec![Value::Long(1)]).unwrap();
    assert_eq!(result, Value::string("static build:1"));
}

#[test]
fn test_undefined_magic_call_is_fatal() {
    let engine = Engine::new();
    let (_meta, class) = install(&engine, Class::<Proxy>::new("Forwarder").magic_call());
    let object = engine.new_object(&class).unwrap();

    let err = engine.call_method(&object, "missing", vec![]).unwrap_err();
    assert_eq!(err, HostError::fatal("Call to undefined method Forwarder::missing()"));

    let err = engine.call_static(&class, "anything", vec![]).unwrap_err();
    assert_eq!(err, HostError::fatal("Call to undefined method Forwarder::anything()"));
}

#[test]
fn test_call_contexts_are_released() {
    let engine = Engine::new();
    let proxy = Class::<Proxy>::new("CountedProxy")
        .magic_call()
        .magic_call_static()
        .build();
    let class = proxy.initialize(&engine, "").unwrap();
    let object = engine.new_object(&class).unwrap();

    engine.call_method(&object, "first", vec![]).unwrap();
    engine.call_method(&object, "second", vec![Value::Null]).unwrap();
    assert!(engine.call_method(&object, "missing", vec![]).is_err());
    assert!(engine.call_method(&object, "explode", vec![]).is_err());
    engine.call_static(&class, "third", vec![]).unwrap();

    let stats = proxy.call_stats();
    assert_eq!(stats.allocated(), 5);
    assert_eq!(stats.released(), 5);
    assert_eq!(stats.live(), 0);
}

#[test]
fn test_native_exception_from_magic_call() {
    let engine = Engine::new();
    let (_meta, class) = install(&engine, Class::<Proxy>::new("ThrowingProxy").magic_call());
    let object = engine.new_object(&class).unwrap();

    let err = engine.call_method(&object, "explode", vec![]).unwrap_err();
    let exception = err.as_exception().unwrap();
    assert_eq!(exception.class, "Exception");
    assert_eq!(exception.message, "boom");
}

#[test]
fn test_invoke() {
    let engine = Engine::new();
    let (_meta, callable) = install(&engine, Class::<Proxy>::new("Adder").invokable());
    let object = engine.new_object(&callable).unwrap();
    let sum = engine
        .invoke(&object, vec![Value::Long(2), Value::Long(40)])
        .unwrap();
    assert_eq!(sum, Value::Long(42));

    let (_meta, plain) = install(&engine, counter_class("NotCallable"));
    let object = engine.new_object(&plain).unwrap();
    let err = engine.invoke(&object, vec![]).unwrap_err();
    assert_eq!(
        err.as_exception().map(|e| e.message.as_str()),
        Some("Object of type NotCallable is not callable")
    );
}

// ============================================================================
// Cast, clone, compare
// ============================================================================

#[test]
fn test_cast_branches_are_independent() {
    executor::reset();
    let engine = Engine::new();
    let (_meta, class) = install(
        &engine,
        Class::<Temperature>::with_constructor("Temperature", warm)
            .castable(),
    );
    let object = engine.new_object(&class).unwrap();

    assert_eq!(engine.cast(&object, CastType::Long).unwrap(), Value::Long(22));
    assert_eq!(engine.cast(&object, CastType::String).unwrap(), Value::string("21.6C"));
    assert_eq!(engine.cast(&object, CastType::Bool).unwrap(), Value::Bool(true));
    assert!(executor::take_reported().is_empty());

    assert_eq!(engine.cast(&object, CastType::Double).unwrap(), Value::Double(1.0));
    assert_eq!(executor::take_reported().len(), 1);
}

#[test]
fn test_clone_copies_native_instance() {
    let engine = Engine::new();
    let (_meta, class) = install(&engine, counter_class("ClonableCounter").clonable());
    let original = engine.new_object(&class).unwrap();
    engine.call_method(&original, "increment", vec![Value::Long(2)]).unwrap();

    let copy = engine.clone_object(&original).unwrap();
    engine.call_method(&copy, "increment", vec![]).unwrap();

    assert_eq!(engine.call_method(&original, "current", vec![]).unwrap(), Value::Long(2));
    assert_eq!(engine.call_method(&copy, "current", vec![]).unwrap(), Value::Long(3));
}

#[test]
fn test_non_clonable_class_is_uncloneable() {
    let engine = Engine::new();
    let (_meta, class) = install(&engine, counter_class("SingleCounter"));
    let object = engine.new_object(&class).unwrap();
    let err = engine.clone_object(&object).unwrap_err();
    assert_eq!(
        err.as_exception().map(|e| e.message.as_str()),
        Some("Trying to clone an uncloneable object of class SingleCounter")
    );
}

#[test]
fn test_comparable_objects() {
    let engine = Engine::new();
    let (_meta, class) = install(&engine, counter_class("RankedCounter").comparable());
    let low = engine.new_object(&class).unwrap();
    let high = engine.new_object(&class).unwrap();
    engine.call_method(&high, "increment", vec![Value::Long(10)]).unwrap();

    assert_eq!(engine.compare_objects(&low, &high).unwrap(), -1);
    assert_eq!(engine.compare_objects(&high, &low).unwrap(), 1);
    assert_eq!(engine.compare_objects(&low, &low).unwrap(), 0);

    let (_meta, other) = install(&engine, counter_class("OtherCounter"));
    let stranger = engine.new_object(&other).unwrap();
    assert_eq!(engine.compare_objects(&low, &stranger).unwrap(), 1);
}

// ============================================================================
// Release
// ============================================================================

static SENSOR_DESTRUCTED: AtomicUsize = AtomicUsize::new(0);
static SENSOR_FREED: AtomicUsize = AtomicUsize::new(0);
static BEACON_FREED: AtomicUsize = AtomicUsize::new(0);

#[derive(Default)]
struct Sensor;

impl Destructible for Sensor {
    fn destruct(&mut self) -> NativeResult<()> {
        SENSOR_DESTRUCTED.fetch_add(1, AtomicOrdering::SeqCst);
        Ok(())
    }
}

impl Drop for Sensor {
    fn drop(&mut self) {
        SENSOR_FREED.fetch_add(1, AtomicOrdering::SeqCst);
    }
}

#[derive(Default)]
struct Beacon;

impl Drop for Beacon {
    fn drop(&mut self) {
        BEACON_FREED.fetch_add(1, AtomicOrdering::SeqCst);
    }
}

#[test]
fn test_destruct_then_free_exactly_once() {
    let engine = Engine::new();
    let class = Class::<Sensor>::new("Sensor")
        .destructible()
        .build();
    let entry = class.initialize(&engine, "").unwrap();

    let object = engine.new_object(&entry).unwrap();
    let alias = object.clone();
    drop(object);
    assert_eq!(SENSOR_DESTRUCTED.load(AtomicOrdering::SeqCst), 0);
    drop(alias);

    assert_eq!(SENSOR_DESTRUCTED.load(AtomicOrdering::SeqCst), 1);
    assert_eq!(SENSOR_FREED.load(AtomicOrdering::SeqCst), 1);
    assert!(engine.take_exception().is_none());
}

#[test]
fn test_free_without_destructor() {
    let engine = Engine::new();
    let class = Class::<Beacon>::new("Beacon").build();
    let entry = class.initialize(&engine, "").unwrap();

    drop(engine.new_object(&entry).unwrap());
    assert_eq!(BEACON_FREED.load(AtomicOrdering::SeqCst), 1);
}
