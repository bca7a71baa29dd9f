#![cfg(feature = "local-path")]

use std::ptr::NonNull;
use std::thread;

use fsport::{LocalPathStore, Port, PortConfig, PortError, PortFeatures, ThreadLocalBackend};
use sim_kernel::{KernelConfig, SimKernel};

/// Stand-in for the filesystem core's directory object.
#[derive(Debug)]
struct Cwd {
    cluster: u32,
}

fn setup() -> (SimKernel, Port<SimKernel>) {
    sim_kernel::logging::init();
    let kernel = SimKernel::running();
    let port = Port::new(kernel.clone(), &PortConfig::new()).unwrap();
    (kernel, port)
}

#[test]
fn defaults_to_last_slot() {
    let (_kernel, port) = setup();
    let store = LocalPathStore::<_, Cwd>::new(&port).unwrap();
    assert_eq!(store.slot(), 4);

    // A second store on the same port shares the claim.
    let again = LocalPathStore::<_, Cwd>::new(&port).unwrap();
    assert_eq!(again.slot(), 4);
}

#[test]
fn get_before_set_is_none() {
    let (_kernel, port) = setup();
    let store = LocalPathStore::<_, Cwd>::new(&port).unwrap();
    assert!(store.get().is_none());
}

#[test]
fn set_and_clear() {
    let (_kernel, port) = setup();
    let store = LocalPathStore::<_, Cwd>::new(&port).unwrap();
    let mut cwd = Cwd { cluster: 2 };
    let ptr = NonNull::from(&mut cwd);

    store.set(Some(ptr));
    assert_eq!(store.get(), Some(ptr));
    // SAFETY: `cwd` outlives every use of the pointer in this test.
    assert_eq!(unsafe { store.get().unwrap().as_ref() }.cluster, 2);

    store.set(None);
    assert!(store.get().is_none());
}

#[test]
fn each_thread_sees_its_own_path() {
    let (_kernel, port) = setup();
    let store = LocalPathStore::<_, Cwd>::new(&port).unwrap();

    let mut main_cwd = Cwd { cluster: 2 };
    let main_ptr = NonNull::from(&mut main_cwd);
    store.set(Some(main_ptr));

    thread::scope(|s| {
        for cluster in [10, 20, 30] {
            let port = &port;
            s.spawn(move || {
                let store = LocalPathStore::<_, Cwd>::new(port).unwrap();
                assert!(store.get().is_none());

                let mut cwd = Cwd { cluster };
                store.set(Some(NonNull::from(&mut cwd)));
                // SAFETY: `cwd` lives until the end of this closure.
                assert_eq!(unsafe { store.get().unwrap().as_ref() }.cluster, cluster);
                store.set(None);
            });
        }
    });

    assert_eq!(store.get(), Some(main_ptr));
}

#[test]
fn taken_slot_is_config_error() {
    let (kernel, port) = setup();
    assert!(kernel.thread_local_claim(4));
    assert!(matches!(
        LocalPathStore::<_, Cwd>::new(&port),
        Err(PortError::Config(_))
    ));
}

#[test]
fn configured_slot_is_used() {
    sim_kernel::logging::init();
    let kernel = SimKernel::running();
    let port = Port::new(kernel.clone(), &PortConfig::new().with_local_path_slot(1)).unwrap();
    let store = LocalPathStore::<_, Cwd>::new(&port).unwrap();
    assert_eq!(store.slot(), 1);
    assert!(!kernel.thread_local_claim(1));
    assert!(kernel.thread_local_claim(4));
}

#[test]
fn out_of_range_slot_is_config_error() {
    sim_kernel::logging::init();
    let kernel = SimKernel::running();
    let port = Port::new(kernel, &PortConfig::new().with_local_path_slot(5)).unwrap();
    assert!(matches!(
        LocalPathStore::<_, Cwd>::new(&port),
        Err(PortError::Config(_))
    ));
}

#[test]
fn backend_without_slots_is_config_error() {
    sim_kernel::logging::init();
    let kernel = SimKernel::new(KernelConfig {
        thread_local_slots: 0,
        ..KernelConfig::default()
    });
    kernel.start_scheduler();
    let port = Port::new(kernel, &PortConfig::new()).unwrap();
    assert!(matches!(
        LocalPathStore::<_, Cwd>::new(&port),
        Err(PortError::Config(_))
    ));
}

#[test]
fn disabled_feature_is_config_error() {
    sim_kernel::logging::init();
    let kernel = SimKernel::running();
    let config = PortConfig::new().with_features(PortFeatures::all() - PortFeatures::LOCAL_PATH);
    let port = Port::new(kernel.clone(), &config).unwrap();
    assert!(matches!(
        LocalPathStore::<_, Cwd>::new(&port),
        Err(PortError::Config(_))
    ));
    // Nothing was claimed.
    assert!(kernel.thread_local_claim(4));
}

#[test]
fn kernels_keep_separate_slots() {
    sim_kernel::logging::init();
    let kernel = SimKernel::running();
    let port = Port::new(kernel.clone(), &PortConfig::new()).unwrap();
    assert!(kernel.thread_local_claim(4));
    assert!(LocalPathStore::<_, Cwd>::new(&port).is_err());

    let other = SimKernel::running();
    let other_port = Port::new(other, &PortConfig::new()).unwrap();
    assert_eq!(LocalPathStore::<_, Cwd>::new(&other_port).unwrap().slot(), 4);
}
