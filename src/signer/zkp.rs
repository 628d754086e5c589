//! Signer backed by the native `zkp` payload library
//!
//! Every entry point returns 0 on success and hands back a buffer allocated
//! with `malloc`; we copy it out and release it with `free` before returning.
//! Inputs are copied into owned, mutable buffers since the C signatures take
//! non-const pointers.

use std::ffi::CStr;
use std::ptr;

use libc::{c_char, c_void, size_t};
use tracing::{debug, warn};
use zeroize::Zeroizing;

use super::{Signer, SignerOperation, SignerOutput};
use crate::approval::{PayloadDecoder, SummaryField, TransactionKind};
use crate::session::{RootSeed, ROOT_SEED_LEN};
use crate::types::{Result, SignerError};

mod ffi {
    use libc::{c_char, c_int, c_uchar, c_void, size_t};

    pub type PayloadFn = unsafe extern "C" fn(
        root_seed: *mut c_uchar,
        buffer: *mut c_uchar,
        len: size_t,
        res: *mut *mut c_void,
        res_len: *mut size_t,
    ) -> c_int;

    pub type DecodeFn =
        unsafe extern "C" fn(buffer: *mut c_uchar, len: size_t, res: *mut *mut c_char) -> c_int;

    #[link(name = "zkp")]
    extern "C" {
        pub fn create_account(password: *mut c_char, res: *mut *mut c_char, res_len: *mut size_t) -> c_int;
        pub fn load_root_seed(password: *mut c_char, res: *mut *mut c_void) -> c_int;

        pub fn recover_account(
            root_seed: *mut c_uchar,
            buffer: *mut c_uchar,
            len: size_t,
            res: *mut *mut c_void,
            res_len: *mut size_t,
        ) -> c_int;
        pub fn generate_mint_data(
            root_seed: *mut c_uchar,
            buffer: *mut c_uchar,
            len: size_t,
            res: *mut *mut c_void,
            res_len: *mut size_t,
        ) -> c_int;
        pub fn batch_generate_private_transfer_data(
            root_seed: *mut c_uchar,
            buffer: *mut c_uchar,
            len: size_t,
            res: *mut *mut c_void,
            res_len: *mut size_t,
        ) -> c_int;
        pub fn batch_generate_reclaim_data(
            root_seed: *mut c_uchar,
            buffer: *mut c_uchar,
            len: size_t,
            res: *mut *mut c_void,
            res_len: *mut size_t,
        ) -> c_int;
        pub fn derive_shielded_address(
            root_seed: *mut c_uchar,
            buffer: *mut c_uchar,
            len: size_t,
            res: *mut *mut c_void,
            res_len: *mut size_t,
        ) -> c_int;
        pub fn generate_asset(
            root_seed: *mut c_uchar,
            buffer: *mut c_uchar,
            len: size_t,
            res: *mut *mut c_void,
            res_len: *mut size_t,
        ) -> c_int;

        pub fn get_reclaim_batch_params_value(buffer: *mut c_uchar, len: size_t, res: *mut *mut c_char) -> c_int;
        pub fn get_reclaim_batch_params_currency_symbol(
            buffer: *mut c_uchar,
            len: size_t,
            res: *mut *mut c_char,
        ) -> c_int;
        pub fn get_private_transfer_batch_params_value(
            buffer: *mut c_uchar,
            len: size_t,
            res: *mut *mut c_char,
        ) -> c_int;
        pub fn get_private_transfer_batch_params_currency_symbol(
            buffer: *mut c_uchar,
            len: size_t,
            res: *mut *mut c_char,
        ) -> c_int;
        pub fn get_private_transfer_batch_params_recipient(
            buffer: *mut c_uchar,
            len: size_t,
            res: *mut *mut c_char,
        ) -> c_int;
    }
}

/// Signer calling into `libzkp`
#[derive(Debug, Default, Clone, Copy)]
pub struct ZkpSigner;

impl ZkpSigner {
    pub fn new() -> Self {
        Self
    }
}

fn payload_fn(operation: SignerOperation) -> ffi::PayloadFn {
    match operation {
        SignerOperation::DeriveShieldedAddress => ffi::derive_shielded_address,
        SignerOperation::GenerateAsset => ffi::generate_asset,
        SignerOperation::RecoverAccount => ffi::recover_account,
        SignerOperation::GenerateMintData => ffi::generate_mint_data,
        SignerOperation::GenerateReclaimData => ffi::batch_generate_reclaim_data,
        SignerOperation::GeneratePrivateTransferData => ffi::batch_generate_private_transfer_data,
    }
}

fn decode_fn(kind: TransactionKind, field: SummaryField) -> Option<ffi::DecodeFn> {
    match (kind, field) {
        (TransactionKind::Reclaim, SummaryField::Value) => Some(ffi::get_reclaim_batch_params_value),
        (TransactionKind::Reclaim, SummaryField::CurrencySymbol) => {
            Some(ffi::get_reclaim_batch_params_currency_symbol)
        }
        (TransactionKind::PrivateTransfer, SummaryField::Value) => {
            Some(ffi::get_private_transfer_batch_params_value)
        }
        (TransactionKind::PrivateTransfer, SummaryField::CurrencySymbol) => {
            Some(ffi::get_private_transfer_batch_params_currency_symbol)
        }
        (TransactionKind::PrivateTransfer, SummaryField::Recipient) => {
            Some(ffi::get_private_transfer_batch_params_recipient)
        }
        _ => None,
    }
}

/// NUL-terminated copy of `password` that is wiped on drop
fn c_password(password: &str) -> Result<Zeroizing<Vec<u8>>> {
    if password.as_bytes().contains(&0) {
        return Err(SignerError::Account("password contains a NUL byte".into()));
    }
    let mut buf = Zeroizing::new(Vec::with_capacity(password.len() + 1));
    buf.extend_from_slice(password.as_bytes());
    buf.push(0);
    Ok(buf)
}

/// Copy a library-owned C string and release it
///
/// # Safety
/// `ptr` must be null or a NUL-terminated string allocated with `malloc`.
unsafe fn take_c_string(ptr: *mut c_char) -> Zeroizing<String> {
    if ptr.is_null() {
        return Zeroizing::new(String::new());
    }
    let value = CStr::from_ptr(ptr).to_string_lossy().into_owned();
    libc::free(ptr as *mut c_void);
    Zeroizing::new(value)
}

/// Copy a library-owned byte buffer and release it
///
/// # Safety
/// `ptr` must be null or point to `len` readable bytes allocated with `malloc`.
unsafe fn take_buffer(ptr: *mut c_void, len: size_t) -> Vec<u8> {
    if ptr.is_null() {
        return Vec::new();
    }
    let bytes = std::slice::from_raw_parts(ptr as *const u8, len).to_vec();
    libc::free(ptr);
    bytes
}

impl Signer for ZkpSigner {
    fn execute(&self, operation: SignerOperation, root_seed: &RootSeed, input: &[u8]) -> SignerOutput {
        let mut seed = Zeroizing::new(*root_seed.as_bytes());
        let mut buffer = input.to_vec();
        let mut res: *mut c_void = ptr::null_mut();
        let mut res_len: size_t = 0;

        // SAFETY: seed and buffer are owned for the duration of the call;
        // res/res_len are valid out-pointers.
        let ret = unsafe {
            payload_fn(operation)(
                seed.as_mut_ptr(),
                buffer.as_mut_ptr(),
                buffer.len(),
                &mut res,
                &mut res_len,
            )
        };
        // SAFETY: on return res is null or a malloc'd buffer of res_len bytes
        let payload = unsafe { take_buffer(res, res_len) };

        debug!(?operation, ret, payload_len = payload.len(), "zkp call finished");
        if ret == 0 {
            SignerOutput::ok(payload)
        } else {
            warn!(?operation, ret, "zkp call failed");
            SignerOutput::failed(payload)
        }
    }

    fn create_account(&self, password: &str) -> Result<Zeroizing<String>> {
        let mut password = c_password(password)?;
        let mut res: *mut c_char = ptr::null_mut();
        let mut res_len: size_t = 0;

        // SAFETY: password is NUL-terminated and outlives the call
        let ret = unsafe {
            ffi::create_account(password.as_mut_ptr() as *mut c_char, &mut res, &mut res_len)
        };
        // SAFETY: res is null or a malloc'd C string
        let phrase = unsafe { take_c_string(res) };

        if ret != 0 {
            return Err(SignerError::Account(format!("create_account returned {}", ret)));
        }
        Ok(phrase)
    }

    fn load_root_seed(&self, password: &str) -> Result<RootSeed> {
        let mut password = c_password(password)?;
        let mut res: *mut c_void = ptr::null_mut();

        // SAFETY: password is NUL-terminated and outlives the call
        let ret = unsafe { ffi::load_root_seed(password.as_mut_ptr() as *mut c_char, &mut res) };

        if res.is_null() {
            return Err(SignerError::Account(format!("load_root_seed returned {}", ret)));
        }
        // SAFETY: a non-null seed buffer is always ROOT_SEED_LEN bytes
        let bytes = Zeroizing::new(unsafe { take_buffer(res, ROOT_SEED_LEN) });

        if ret != 0 {
            return Err(SignerError::Account("incorrect password".into()));
        }
        RootSeed::from_slice(&bytes)
            .ok_or_else(|| SignerError::Account("root seed has the wrong length".into()))
    }
}

impl PayloadDecoder for ZkpSigner {
    fn decode_field(&self, kind: TransactionKind, field: SummaryField, bytes: &[u8]) -> Result<String> {
        let decode = decode_fn(kind, field).ok_or_else(|| {
            SignerError::Signer(format!("{:?} has no decodable {:?} field", kind, field))
        })?;

        let mut buffer = bytes.to_vec();
        let mut res: *mut c_char = ptr::null_mut();

        // SAFETY: buffer is owned for the duration of the call
        let ret = unsafe { decode(buffer.as_mut_ptr(), buffer.len(), &mut res) };
        // SAFETY: res is null or a malloc'd C string
        let value = unsafe { take_c_string(res) };

        if ret != 0 {
            return Err(SignerError::Signer(format!("{:?} decode returned {}", field, ret)));
        }
        Ok(value.to_string())
    }
}
