mod handlers;
mod routes;

pub use handlers::usb::{
    RevertUsbModeResponse, SetUsbModeRequest, SetUsbModeResponse, UsbModeResponse,
};
pub use routes::create_router;
