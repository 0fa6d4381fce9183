pub mod app;
pub mod capture;
pub mod cmd;
pub mod config;
pub mod metrics;
pub mod report;

pub mod util {
    use std::{
        ffi::{c_char, CStr},
        io,
    };

    use rstkill_common::Error;

    pub fn uname() -> io::Result<SysInfo> {
        let mut buf = unsafe { std::mem::zeroed() };
        match unsafe { libc::uname(&mut buf) } {
            0 => Ok(SysInfo::from(buf)),
            _ => Err(io::Error::last_os_error()),
        }
    }

    #[derive(Debug)]
    pub struct SysInfo {
        pub sys_name: String,
        pub node_name: String,
        pub release: String,
    }

    impl From<libc::utsname> for SysInfo {
        fn from(value: libc::utsname) -> Self {
            Self {
                sys_name: cstr(&value.sysname[..]).to_string_lossy().to_string(),
                node_name: cstr(&value.nodename[..]).to_string_lossy().to_string(),
                release: cstr(&value.release[..]).to_string_lossy().to_string(),
            }
        }
    }

    #[inline]
    fn cstr(buf: &[c_char]) -> &CStr {
        unsafe { CStr::from_ptr(buf.as_ptr()) }
    }

    /// Raw capture and injection need root (or CAP_NET_RAW).
    pub fn is_root() -> bool {
        unsafe { libc::geteuid() == 0 }
    }

    /// Check that the capture library knows an interface by this name.
    pub fn lookup_interface(name: &str) -> Result<(), Error> {
        let devices = pcap::Device::list()
            .map_err(|e| Error::Configuration(format!("failed to list interfaces: {}", e)))?;

        if devices.iter().any(|d| d.name == name) {
            Ok(())
        } else {
            Err(Error::Configuration(format!(
                "interface '{}' does not exist",
                name
            )))
        }
    }

    pub fn list_interfaces() -> Result<(), Error> {
        let devices = pcap::Device::list()
            .map_err(|e| Error::Configuration(format!("failed to list interfaces: {}", e)))?;

        for device in devices {
            let addrs = device
                .addresses
                .iter()
                .map(|a| a.addr.to_string())
                .collect::<Vec<_>>()
                .join(", ");
            match device.desc {
                Some(desc) => println!("{:<16} {} [{}]", device.name, desc, addrs),
                None => println!("{:<16} [{}]", device.name, addrs),
            }
        }
        Ok(())
    }

    #[cfg(test)]
    mod test {
        use super::uname;

        #[test]
        fn test_uname() {
            let info = uname().unwrap();
            assert!(!info.sys_name.is_empty());
            assert!(!info.release.is_empty());
        }
    }
}
