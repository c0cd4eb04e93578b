#![allow(unused_macros, dead_code)]
macro_rules! verbose_println {
    ($($p:expr),+) => {
        if (config::ARGS.verbose) {
            println!($($p),+);
        }
    }
}
macro_rules! info {
    ($($p:expr),+) => {
        println!(concat!(blue!("INFO"),": {}"),format_args!($($p),+))
    }
}

macro_rules! warn {
    ($($p:expr),+) => {
        println!(concat!(red!("WARNING"),": {}"),format_args!($($p),+))
    }
}
// only shows up with --verbose
macro_rules! verbose_warn {
    ($($p:expr),+) => {
        if (config::ARGS.verbose) {
            warn!($($p),+);
        }
    }
}
macro_rules! general_err {
    ($msg:expr) => {
        Error::new(crate::ErrorKind::General, None, format!("{}", $msg).as_str())
    };
}
macro_rules! malformed_err {
    ($ctx:expr,$($msg:expr),*) => {
        Error::new(
            crate::ErrorKind::Malformed,
            $ctx,
            format!("{} {}", red!("Malformed Record"), format!($($msg),*)).as_str(),
        )
    };
}
macro_rules! classification_err {
    ($ctx:expr,$($msg:expr),*) => {
        Error::new(
            crate::ErrorKind::Classification,
            $ctx,
            format!("{} {}", red!("Classification Error"), format!($($msg),*)).as_str(),
        )
    };
}
macro_rules! size_err {
    ($ctx:expr,$($msg:expr),*) => {
        Error::new(
            crate::ErrorKind::SizeMismatch,
            $ctx,
            format!("{} {}", red!("Size Mismatch"), format!($($msg),*)).as_str(),
        )
    };
}
macro_rules! collision_err {
    ($ctx:expr,$($msg:expr),*) => {
        Error::new(
            crate::ErrorKind::EncodingCollision,
            $ctx,
            format!("{} {}", red!("Encoding Collision"), format!($($msg),*)).as_str(),
        )
    };
}
macro_rules! doc_err {
    ($ctx:expr,$($msg:expr),*) => {
        Error::new(crate::ErrorKind::DocLookup, $ctx, format!($($msg),*).as_str())
    };
}
macro_rules! memory_err {
    ($($msg:expr),*) => {
        Error::new(crate::ErrorKind::Memory, None, format!($($msg),*).as_str())
    };
}
macro_rules! color {
    ($color: literal, $msg: expr) => {
        concat!("\x1b[", $color, "m", $msg, "\x1b[0m")
    };
}
macro_rules! red {
    ($msg:expr) => {
        color!(91, $msg)
    };
}
macro_rules! green {
    ($msg:expr) => {
        color!(92, $msg)
    };
}
macro_rules! yellow {
    ($msg:expr) => {
        color!(93, $msg)
    };
}
macro_rules! blue {
    ($msg:expr) => {
        color!(94, $msg)
    };
}
